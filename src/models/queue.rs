use serde::{Deserialize, Serialize};

/// Intención de toggle pendiente de confirmación por el servidor.
/// `id` viaja como `client_ref` (token de idempotencia).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToggle {
    pub id: String,
    pub member_id: String,
    pub team_id: String,
    /// Epoch en milisegundos
    pub created_at: i64,
    /// Intentos fallidos; ausente en colas guardadas por versiones anteriores
    #[serde(default)]
    pub attempts: u32,
}

impl PendingToggle {
    pub fn new(id: String, member_id: &str, team_id: &str, created_at: i64) -> Self {
        Self {
            id,
            member_id: member_id.to_string(),
            team_id: team_id.to_string(),
            created_at,
            attempts: 0,
        }
    }

    /// Antigüedad en ms (nunca negativa aunque el reloj retroceda)
    pub fn age_ms(&self, now_ms: i64) -> u64 {
        now_ms.saturating_sub(self.created_at).max(0) as u64
    }
}
