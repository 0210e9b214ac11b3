use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    ClockedIn,
    ClockedOut,
}

/// Respuesta de /api/session.toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToggleResponse {
    pub state: ToggleState,
    pub session_id: String,
    #[serde(default)]
    pub start_ts: Option<String>,
    #[serde(default)]
    pub end_ts: Option<String>,
    #[serde(default)]
    pub minutes: Option<u32>,
}
