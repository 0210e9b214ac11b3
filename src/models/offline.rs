use serde::{Deserialize, Serialize};

/// Trabajo offline enviado por un estudiante para aprobación
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineSubmission {
    pub member_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    InPerson,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineStatus {
    PendingApproval,
    Approved,
    Rejected,
    Open,
    Closed,
}

impl OfflineStatus {
    /// "pending approval"
    pub fn label(&self) -> &'static str {
        match self {
            OfflineStatus::PendingApproval => "pending approval",
            OfflineStatus::Approved => "approved",
            OfflineStatus::Rejected => "rejected",
            OfflineStatus::Open => "open",
            OfflineStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineHistoryEntry {
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(default)]
    pub start_ts: Option<String>,
    #[serde(default)]
    pub end_ts: Option<String>,
    pub status: OfflineStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Acción de revisión del coach sobre una sesión offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    Edit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_wire_format() {
        let json = r#"{"session_id":"S9","type":"offline","category":"CAD","minutes":45,"status":"pending_approval"}"#;
        let entry: OfflineHistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.kind, SessionKind::Offline);
        assert_eq!(entry.status, OfflineStatus::PendingApproval);
        assert_eq!(entry.status.label(), "pending approval");
        assert!(entry.note.is_none());
    }

    #[test]
    fn test_submission_omits_empty_optionals() {
        let submission = OfflineSubmission {
            member_id: "M1".into(),
            minutes: Some(60),
            start_ts: None,
            end_ts: None,
            category: "Outreach".into(),
            note: None,
        };
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["minutes"], 60);
        assert!(value.get("note").is_none());
        assert!(value.get("start_ts").is_none());
    }
}
