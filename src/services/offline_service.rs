// ============================================================================
// OFFLINE SERVICE - persistencia local (localStorage)
// ============================================================================
// Cola de toggles bajo una clave fija + preferencias del kiosk
// ============================================================================

use gloo_storage::{LocalStorage, Storage};

use crate::services::offline_queue::QueueStore;

const LAST_TEAM_KEY: &str = "ftc_attendance_last_team";

/// Cola offline en localStorage (string JSON crudo)
#[derive(Debug, Clone)]
pub struct LocalQueueStore {
    key: String,
}

impl LocalQueueStore {
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl QueueStore for LocalQueueStore {
    fn load(&self) -> Result<Option<String>, String> {
        LocalStorage::raw()
            .get_item(&self.key)
            .map_err(|_| "Error leyendo localStorage".to_string())
    }

    fn save(&self, raw: &str) -> Result<(), String> {
        LocalStorage::raw()
            .set_item(&self.key, raw)
            .map_err(|_| "Error guardando en localStorage".to_string())
    }
}

/// Último equipo elegido en el kiosk
pub fn load_last_team() -> Option<String> {
    LocalStorage::get(LAST_TEAM_KEY).ok()
}

pub fn save_last_team(team_id: &str) {
    if let Err(e) = LocalStorage::set(LAST_TEAM_KEY, team_id) {
        log::warn!("⚠️ No se pudo recordar el equipo: {}", e);
    }
}
