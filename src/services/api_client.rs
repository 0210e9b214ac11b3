// ============================================================================
// API CLIENT - SOLO COMUNICACIÓN HTTP (Stateless)
// ============================================================================
// Una familia de endpoints: POST JSON a {base}/api/<op>, respuesta
// envuelta en { ok, data?, error? }. El transporte real (fetch) se inyecta.
// ============================================================================

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{
    ImportRow, Member, OfflineHistoryEntry, OfflineSubmission, ReviewAction, SessionToggleResponse,
    StatusEntry,
};

/// Error de la API
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No se pudo contactar al servidor
    Network(String),
    /// Respuesta HTTP no 2xx
    Http { status: u16 },
    /// Cuerpo ilegible o sin `data`
    Decode(String),
    Encode(String),
    /// `ok: false`: regla de negocio rechazada por el backend
    Rejected(String),
}

impl ApiError {
    /// Fallos de red/servidor que tiene sentido reintentar
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Http { status } => *status >= 500 || *status == 408 || *status == 429,
            ApiError::Decode(_) | ApiError::Encode(_) | ApiError::Rejected(_) => false,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { status } => write!(f, "Request failed: {}", status),
            ApiError::Decode(msg) => write!(f, "Parse error: {}", msg),
            ApiError::Encode(msg) => write!(f, "Serialization error: {}", msg),
            ApiError::Rejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Respuesta HTTP cruda
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Transporte HTTP (fetch en el navegador, fakes en tests)
#[allow(async_fn_in_trait)]
pub trait HttpTransport: 'static {
    async fn post_json(&self, url: &str, body: String) -> Result<HttpReply, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Cliente API - SOLO comunicación HTTP (stateless)
pub struct ApiClient<T> {
    base_url: String,
    season_id: String,
    transport: Rc<T>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            season_id: self.season_id.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(base_url: &str, season_id: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            season_id: season_id.to_string(),
            transport: Rc::new(transport),
        }
    }

    pub fn season_id(&self) -> &str {
        &self.season_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<Req, Res>(&self, path: &str, request: &Req) -> Result<Res, ApiError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let body = serde_json::to_string(request).map_err(|e| ApiError::Encode(e.to_string()))?;

        let reply = self.transport.post_json(&url, body).await?;

        if !(200..300).contains(&reply.status) {
            log::warn!("⚠️ {} -> HTTP {}", path, reply.status);
            return Err(ApiError::Http { status: reply.status });
        }

        let envelope: ApiEnvelope<Res> = serde_json::from_str(&reply.body)
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if !envelope.ok {
            let message = envelope.error.unwrap_or_else(|| "Unknown error".to_string());
            log::warn!("⚠️ {} rechazado: {}", path, message);
            return Err(ApiError::Rejected(message));
        }

        envelope
            .data
            .ok_or_else(|| ApiError::Decode(format!("{}: respuesta sin data", path)))
    }

    /// Listar roster del equipo
    pub async fn roster_list(&self, team_id: &str) -> Result<Vec<Member>, ApiError> {
        let request = TeamRequest { season_id: &self.season_id, team_id };
        let data: RosterData = self.call("/api/roster.list", &request).await?;
        log::info!("📋 Roster {}: {} miembros", team_id, data.members.len());
        Ok(data.members)
    }

    /// Snapshot de quién está dentro ahora
    pub async fn status_now(&self, team_id: &str) -> Result<Vec<StatusEntry>, ApiError> {
        let request = TeamRequest { season_id: &self.season_id, team_id };
        let data: StatusData = self.call("/api/status.now", &request).await?;
        Ok(data.entries)
    }

    /// Toggle de fichaje; `client_ref` es el token de idempotencia
    pub async fn toggle(
        &self,
        team_id: &str,
        member_id: &str,
        client_ref: &str,
    ) -> Result<SessionToggleResponse, ApiError> {
        let request = ToggleRequest {
            season_id: &self.season_id,
            team_id,
            member_id,
            client_ref,
        };
        log::info!("🔁 Toggle {} ({}) ref={}", member_id, team_id, client_ref);
        self.call("/api/session.toggle", &request).await
    }

    pub async fn offline_submit(
        &self,
        team_id: Option<&str>,
        submission: &OfflineSubmission,
    ) -> Result<SubmitReceipt, ApiError> {
        let request = SubmitRequest {
            season_id: &self.season_id,
            team_id,
            submission,
        };
        self.call("/api/offline.submit", &request).await
    }

    pub async fn offline_history(&self, member_id: &str) -> Result<Vec<OfflineHistoryEntry>, ApiError> {
        let request = HistoryRequest { season_id: &self.season_id, member_id };
        let data: HistoryData = self.call("/api/offline.history", &request).await?;
        Ok(data.sessions)
    }

    /// Aprobar / rechazar / editar una sesión offline
    pub async fn offline_review(
        &self,
        session_id: &str,
        action: ReviewAction,
        minutes: Option<u32>,
        note: Option<&str>,
    ) -> Result<ReviewReceipt, ApiError> {
        let request = ReviewRequest {
            season_id: &self.season_id,
            session_id,
            action,
            minutes,
            note,
        };
        log::info!("📝 Revisión {:?} sobre {}", action, session_id);
        self.call("/api/offline.review", &request).await
    }

    /// Cerrar todas las sesiones abiertas del equipo
    pub async fn clockout_all(&self, team_id: &str) -> Result<u32, ApiError> {
        let request = TeamRequest { season_id: &self.season_id, team_id };
        let data: ClockoutData = self.call("/api/admin.clockout_all", &request).await?;
        log::info!("🚪 Clock-out masivo {}: {} sesiones cerradas", team_id, data.count_closed);
        Ok(data.count_closed)
    }

    pub async fn import_members(&self, team_id: &str, rows: &[ImportRow]) -> Result<u32, ApiError> {
        let request = ImportRequest {
            season_id: &self.season_id,
            team_id,
            rows,
        };
        let data: ImportData = self.call("/api/admin.import_members", &request).await?;
        log::info!("📥 Importados {} miembros en {}", data.added, team_id);
        Ok(data.added)
    }
}

#[derive(Serialize)]
struct TeamRequest<'a> {
    season_id: &'a str,
    team_id: &'a str,
}

#[derive(Serialize)]
struct ToggleRequest<'a> {
    season_id: &'a str,
    team_id: &'a str,
    member_id: &'a str,
    client_ref: &'a str,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    season_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    team_id: Option<&'a str>,
    #[serde(flatten)]
    submission: &'a OfflineSubmission,
}

#[derive(Serialize)]
struct HistoryRequest<'a> {
    season_id: &'a str,
    member_id: &'a str,
}

#[derive(Serialize)]
struct ReviewRequest<'a> {
    season_id: &'a str,
    session_id: &'a str,
    action: ReviewAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    season_id: &'a str,
    team_id: &'a str,
    rows: &'a [ImportRow],
}

#[derive(Deserialize)]
struct RosterData {
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct StatusData {
    entries: Vec<StatusEntry>,
}

#[derive(Deserialize)]
struct HistoryData {
    sessions: Vec<OfflineHistoryEntry>,
}

#[derive(Deserialize)]
struct ClockoutData {
    count_closed: u32,
}

#[derive(Deserialize)]
struct ImportData {
    added: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitReceipt {
    pub status: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewReceipt {
    pub status: String,
}
