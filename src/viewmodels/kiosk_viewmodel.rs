// ============================================================================
// KIOSK VIEWMODEL - LÓGICA DEL KIOSK DE FICHAJE
// ============================================================================
// Devuelve valores, las views actualizan el estado
// ============================================================================

use chrono::{DateTime, Local};

use crate::models::{Member, PendingToggle, SessionToggleResponse, StatusBoard};
use crate::services::api_client::{ApiClient, ApiError, HttpTransport};
use crate::services::offline_queue::{OfflineQueue, QueueRuntime, QueueStore, ToggleSender};

/// Roster + tablero de estado ya reconciliado con la cola
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSnapshot {
    pub roster: Vec<Member>,
    pub board: StatusBoard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// Sin conexión: encolado y aplicado de forma optimista
    Queued(PendingToggle),
    /// Confirmado por el servidor; `board` es el estado recargado (si se pudo)
    Applied {
        response: SessionToggleResponse,
        board: Option<StatusBoard>,
    },
}

/// Datos listos para pintar un tile
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTileModel {
    pub member_id: String,
    pub label: String,
    pub initials: String,
    pub photo_url: Option<String>,
    pub is_in: bool,
    pub since: Option<String>,
    pub pending: bool,
}

/// ViewModel del kiosk - SOLO lógica
pub struct KioskViewModel<H, S, T, R: QueueRuntime> {
    api: ApiClient<H>,
    queue: OfflineQueue<S, T, R>,
}

impl<H, S, T, R> KioskViewModel<H, S, T, R>
where
    H: HttpTransport,
    S: QueueStore,
    T: ToggleSender,
    R: QueueRuntime,
{
    pub fn new(api: ApiClient<H>, queue: OfflineQueue<S, T, R>) -> Self {
        Self { api, queue }
    }

    pub fn queue(&self) -> &OfflineQueue<S, T, R> {
        &self.queue
    }

    /// Roster + estado del equipo, con los toggles aún en cola encima
    pub async fn load_team(&self, team_id: &str) -> Result<TeamSnapshot, ApiError> {
        let roster = self.api.roster_list(team_id).await?;
        let board = self.refresh_status(team_id).await?;
        Ok(TeamSnapshot { roster, board })
    }

    pub async fn refresh_status(&self, team_id: &str) -> Result<StatusBoard, ApiError> {
        let entries = self.api.status_now(team_id).await?;
        Ok(StatusBoard::reconcile(entries, &self.queue.pending(), team_id))
    }

    /// Offline: encola (el llamador aplica el overlay optimista).
    /// Online: toggle directo; los errores suben a la view.
    pub async fn toggle(&self, team_id: &str, member_id: &str) -> Result<ToggleOutcome, ApiError> {
        if !self.queue.is_online() {
            let pending = self.queue.enqueue(member_id, team_id);
            return Ok(ToggleOutcome::Queued(pending));
        }

        let client_ref = uuid::Uuid::new_v4().to_string();
        let response = self.api.toggle(team_id, member_id, &client_ref).await?;

        let board = match self.refresh_status(team_id).await {
            Ok(board) => Some(board),
            Err(e) => {
                log::warn!("⚠️ Toggle aplicado pero no se pudo recargar el estado: {}", e);
                None
            }
        };
        Ok(ToggleOutcome::Applied { response, board })
    }
}

/// Búsqueda case-insensitive sobre "Nombre I"
pub fn matches_search(member: &Member, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty() || member.search_key().contains(&query)
}

pub fn member_tiles(roster: &[Member], board: &StatusBoard, query: &str) -> Vec<MemberTileModel> {
    roster
        .iter()
        .filter(|member| matches_search(member, query))
        .map(|member| MemberTileModel {
            member_id: member.member_id.clone(),
            label: member.display_name(),
            initials: member.initials(),
            photo_url: member.photo_url.clone(),
            is_in: board.is_in(&member.member_id),
            since: board.started_at(&member.member_id).and_then(since_label),
            pending: board.is_optimistic(&member.member_id),
        })
        .collect()
}

/// "2024-10-01T16:00:00Z" -> hora local "HH:MM"
pub fn since_label(started_at: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(started_at)
        .ok()
        .map(|ts| ts.with_timezone(&Local).format("%H:%M").to_string())
}

pub fn status_line(is_online: bool, pending: usize) -> String {
    format!(
        "Status: {}. Pending toggles: {}",
        if is_online { "Online" } else { "Offline" },
        pending
    )
}
