// ============================================================================
// ADMIN VIEWMODEL - PANEL DEL COACH
// ============================================================================
// Asistencia del día, aprobaciones offline e importación CSV
// ============================================================================

use crate::models::{
    ImportRow, Member, OfflineHistoryEntry, OfflineStatus, ReviewAction, StatusBoard,
};
use crate::services::api_client::{ApiClient, ApiError, HttpTransport, ReviewReceipt};

/// Filtro de la lista de aprobaciones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFilter {
    #[default]
    Pending,
    Approved,
    Rejected,
    All,
}

impl HistoryFilter {
    pub const ALL: [HistoryFilter; 4] = [
        HistoryFilter::Pending,
        HistoryFilter::Approved,
        HistoryFilter::Rejected,
        HistoryFilter::All,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            HistoryFilter::Pending => "pending_approval",
            HistoryFilter::Approved => "approved",
            HistoryFilter::Rejected => "rejected",
            HistoryFilter::All => "all",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoryFilter::Pending => "Pending",
            HistoryFilter::Approved => "Approved",
            HistoryFilter::Rejected => "Rejected",
            HistoryFilter::All => "All",
        }
    }

    pub fn from_value(value: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.value() == value)
            .unwrap_or_default()
    }

    pub fn matches(&self, status: OfflineStatus) -> bool {
        match self {
            HistoryFilter::Pending => status == OfflineStatus::PendingApproval,
            HistoryFilter::Approved => status == OfflineStatus::Approved,
            HistoryFilter::Rejected => status == OfflineStatus::Rejected,
            HistoryFilter::All => true,
        }
    }

    pub fn apply<'a>(&self, history: &'a [OfflineHistoryEntry]) -> Vec<&'a OfflineHistoryEntry> {
        history.iter().filter(|e| self.matches(e.status)).collect()
    }
}

/// `first_name,last_initial,student_email?,photo_url?` por línea.
/// Filas con menos de dos columnas se ignoran; no se valida nada más.
pub fn parse_csv(text: &str) -> Vec<ImportRow> {
    text.trim()
        .lines()
        .map(|line| line.split(',').map(str::trim).collect::<Vec<_>>())
        .filter(|cols| cols.len() >= 2)
        .map(|cols| {
            let optional = |idx: usize| {
                cols.get(idx)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string())
            };
            ImportRow {
                first_name: cols[0].to_string(),
                last_initial: cols[1].to_string(),
                student_email: optional(2),
                photo_url: optional(3),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSnapshot {
    pub roster: Vec<Member>,
    pub board: StatusBoard,
}

pub struct AdminViewModel<H> {
    api: ApiClient<H>,
}

impl<H: HttpTransport> AdminViewModel<H> {
    pub fn new(api: ApiClient<H>) -> Self {
        Self { api }
    }

    pub async fn load_attendance(&self, team_id: &str) -> Result<AttendanceSnapshot, ApiError> {
        let roster = self.api.roster_list(team_id).await?;
        let entries = self.api.status_now(team_id).await?;
        Ok(AttendanceSnapshot {
            roster,
            board: StatusBoard::from_snapshot(entries),
        })
    }

    /// Cierra todas las sesiones abiertas y devuelve el estado recargado
    pub async fn clockout_all(&self, team_id: &str) -> Result<(u32, StatusBoard), ApiError> {
        let closed = self.api.clockout_all(team_id).await?;
        let entries = self.api.status_now(team_id).await?;
        Ok((closed, StatusBoard::from_snapshot(entries)))
    }

    pub async fn history(&self, member_id: &str) -> Result<Vec<OfflineHistoryEntry>, ApiError> {
        self.api.offline_history(member_id).await
    }

    pub async fn review(
        &self,
        session_id: &str,
        action: ReviewAction,
        minutes: Option<u32>,
    ) -> Result<ReviewReceipt, ApiError> {
        self.api.offline_review(session_id, action, minutes, None).await
    }

    /// Importa el CSV; `Ok(None)` si no había filas utilizables
    pub async fn import_csv(&self, team_id: &str, text: &str) -> Result<Option<u32>, ApiError> {
        let rows = parse_csv(text);
        if rows.is_empty() {
            log::warn!("⚠️ CSV sin filas válidas, no se importa nada");
            return Ok(None);
        }
        self.api.import_members(team_id, &rows).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionKind;
    use crate::services::api_client::testing::ScriptedTransport;
    use futures::executor::block_on;
    use serde_json::json;
    use std::rc::Rc;

    fn entry(id: &str, status: OfflineStatus) -> OfflineHistoryEntry {
        OfflineHistoryEntry {
            session_id: id.into(),
            kind: SessionKind::Offline,
            category: Some("CAD".into()),
            minutes: Some(30),
            start_ts: None,
            end_ts: None,
            status,
            note: None,
        }
    }

    #[test]
    fn test_parse_csv_skips_short_rows() {
        let rows = parse_csv(
            "Ada,L,ada@example.com,https://photos/ada.jpg\r\nlonely\nGrace , H\n\nLinus,T,,https://photos/l.png\n",
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].student_email.as_deref(), Some("ada@example.com"));
        assert_eq!(rows[1].first_name, "Grace");
        assert_eq!(rows[1].photo_url, None);
        assert_eq!(rows[2].student_email, None);
        assert_eq!(rows[2].photo_url.as_deref(), Some("https://photos/l.png"));
    }

    #[test]
    fn test_history_filter() {
        let history = vec![
            entry("S1", OfflineStatus::PendingApproval),
            entry("S2", OfflineStatus::Approved),
            entry("S3", OfflineStatus::Rejected),
        ];
        assert_eq!(HistoryFilter::default().apply(&history).len(), 1);
        assert_eq!(HistoryFilter::All.apply(&history).len(), 3);
        assert_eq!(HistoryFilter::from_value("rejected").apply(&history)[0].session_id, "S3");
        assert_eq!(HistoryFilter::from_value("bogus"), HistoryFilter::Pending);
    }

    #[test]
    fn test_clockout_all_reloads_status() {
        let transport = Rc::new(ScriptedTransport::default());
        let vm = AdminViewModel::new(ApiClient::new("https://gas.example", "2024-25", transport.clone()));
        transport.push_ok(json!({ "count_closed": 4 }));
        transport.push_ok(json!({ "entries": [{ "member_id": "M1", "is_in": false }] }));

        let (closed, board) = block_on(vm.clockout_all("GP")).unwrap();
        assert_eq!(closed, 4);
        assert_eq!(board.clocked_in_count(), 0);
        assert!(transport.requests.borrow()[1].0.ends_with("/api/status.now"));
    }

    #[test]
    fn test_import_without_rows_does_not_call_api() {
        let transport = Rc::new(ScriptedTransport::default());
        let vm = AdminViewModel::new(ApiClient::new("https://gas.example", "2024-25", transport.clone()));

        assert_eq!(block_on(vm.import_csv("GP", "just-one-column\n")).unwrap(), None);
        assert!(transport.requests.borrow().is_empty());

        transport.push_ok(json!({ "added": 1 }));
        assert_eq!(block_on(vm.import_csv("GP", "Ada,L")).unwrap(), Some(1));
        assert_eq!(transport.requests.borrow()[0].1["rows"][0]["first_name"], "Ada");
    }
}
