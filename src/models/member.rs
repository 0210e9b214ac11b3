use serde::{Deserialize, Serialize};

/// Estado de asistencia tal como lo devuelve el roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActiveState {
    ClockedIn,
    ClockedOut,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Miembro del roster (proyección de solo lectura del backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    pub first_name: String,
    pub last_initial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub active_state: ActiveState,
}

impl Member {
    /// "Ada L."
    pub fn display_name(&self) -> String {
        format!("{} {}.", self.first_name, self.last_initial)
    }

    /// Texto sobre el que se aplica la búsqueda del kiosk ("Ada L")
    pub fn search_key(&self) -> String {
        format!("{} {}", self.first_name, self.last_initial).to_lowercase()
    }

    pub fn initials(&self) -> String {
        let first = self.first_name.chars().next().map(String::from).unwrap_or_default();
        format!("{}{}", first, self.last_initial)
    }
}

/// Fila de importación CSV (first_name,last_initial,student_email?,photo_url?)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub first_name: String,
    pub last_initial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_active_state_tolerated() {
        let json = r#"{"member_id":"M1","first_name":"Ada","last_initial":"L","active_state":"suspended"}"#;
        let member: Member = serde_json::from_str(json).unwrap();
        assert_eq!(member.active_state, ActiveState::Unknown);
        assert_eq!(member.display_name(), "Ada L.");
        assert_eq!(member.initials(), "AL");
    }
}
