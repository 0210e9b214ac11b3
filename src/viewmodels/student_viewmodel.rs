// ============================================================================
// STUDENT VIEWMODEL - REGISTRO DE TRABAJO OFFLINE
// ============================================================================

use crate::models::{ActiveState, Member, OfflineHistoryEntry, OfflineSubmission};
use crate::services::api_client::{ApiClient, ApiError, HttpTransport, SubmitReceipt};

pub const MIN_MINUTES: u32 = 5;
pub const MAX_MINUTES: u32 = 600;
pub const MINUTES_STEP: u32 = 5;
pub const DEFAULT_MINUTES: u32 = 60;

/// Valores crudos del formulario tal como vienen de los inputs
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineForm {
    pub member_id: String,
    pub category: String,
    pub minutes: String,
    pub note: String,
}

impl OfflineForm {
    pub fn new(default_category: &str) -> Self {
        Self {
            member_id: String::new(),
            category: default_category.to_string(),
            minutes: DEFAULT_MINUTES.to_string(),
            note: String::new(),
        }
    }

    /// Tras un envío correcto sólo se limpia la nota
    pub fn reset_after_submit(&mut self) {
        self.note.clear();
    }

    pub fn validate(&self, categories: &[String]) -> Result<OfflineSubmission, FormError> {
        let member_id = self.member_id.trim();
        if member_id.is_empty() {
            return Err(FormError::MissingMember);
        }

        let category = self.category.trim();
        if !categories.iter().any(|c| c == category) {
            return Err(FormError::UnknownCategory(category.to_string()));
        }

        let minutes: u32 = self
            .minutes
            .trim()
            .parse()
            .map_err(|_| FormError::InvalidMinutes(self.minutes.clone()))?;
        if !(MIN_MINUTES..=MAX_MINUTES).contains(&minutes) || minutes % MINUTES_STEP != 0 {
            return Err(FormError::InvalidMinutes(self.minutes.clone()));
        }

        let note = self.note.trim();
        Ok(OfflineSubmission {
            member_id: member_id.to_string(),
            minutes: Some(minutes),
            start_ts: None,
            end_ts: None,
            category: category.to_string(),
            note: if note.is_empty() { None } else { Some(note.to_string()) },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    MissingMember,
    UnknownCategory(String),
    InvalidMinutes(String),
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::MissingMember => write!(f, "Select your name first"),
            FormError::UnknownCategory(c) => write!(f, "Unknown category: {}", c),
            FormError::InvalidMinutes(raw) => write!(
                f,
                "Minutes must be between {} and {} in steps of {} (got \"{}\")",
                MIN_MINUTES, MAX_MINUTES, MINUTES_STEP, raw
            ),
        }
    }
}

impl std::error::Error for FormError {}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    Form(FormError),
    Api(ApiError),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Form(e) => write!(f, "{}", e),
            SubmitError::Api(e) => write!(f, "There was a problem submitting your entry ({}). Try again later.", e),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<FormError> for SubmitError {
    fn from(e: FormError) -> Self {
        SubmitError::Form(e)
    }
}

impl From<ApiError> for SubmitError {
    fn from(e: ApiError) -> Self {
        SubmitError::Api(e)
    }
}

/// Miembros que pueden registrar trabajo (estado conocido)
pub fn eligible_members(roster: &[Member]) -> Vec<&Member> {
    roster
        .iter()
        .filter(|m| m.active_state != ActiveState::Unknown)
        .collect()
}

/// "CAD · 45 minutes · pending approval"
pub fn history_line(entry: &OfflineHistoryEntry) -> String {
    format!(
        "{} · {} minutes · {}",
        entry.category.as_deref().unwrap_or("Offline work"),
        entry.minutes.unwrap_or(0),
        entry.status.label()
    )
}

pub struct StudentViewModel<H> {
    api: ApiClient<H>,
    categories: Vec<String>,
}

impl<H: HttpTransport> StudentViewModel<H> {
    pub fn new(api: ApiClient<H>, categories: Vec<String>) -> Self {
        Self { api, categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub async fn roster(&self, team_id: &str) -> Result<Vec<Member>, ApiError> {
        self.api.roster_list(team_id).await
    }

    pub async fn submit(&self, team_id: &str, form: &OfflineForm) -> Result<SubmitReceipt, SubmitError> {
        let submission = form.validate(&self.categories)?;
        let receipt = self.api.offline_submit(Some(team_id), &submission).await?;
        log::info!("🕒 Trabajo offline enviado: {} ({})", receipt.session_id, receipt.status);
        Ok(receipt)
    }

    pub async fn history(&self, member_id: &str) -> Result<Vec<OfflineHistoryEntry>, ApiError> {
        if member_id.is_empty() {
            return Ok(Vec::new());
        }
        self.api.offline_history(member_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OfflineStatus;
    use crate::services::api_client::testing::ScriptedTransport;
    use futures::executor::block_on;
    use serde_json::json;
    use std::rc::Rc;

    fn categories() -> Vec<String> {
        vec!["CAD".to_string(), "Outreach".to_string()]
    }

    fn filled(minutes: &str) -> OfflineForm {
        OfflineForm {
            member_id: "M1".into(),
            category: "CAD".into(),
            minutes: minutes.into(),
            note: "  ".into(),
        }
    }

    #[test]
    fn test_minutes_bounds_and_step() {
        for ok in ["5", "60", " 600 "] {
            assert!(filled(ok).validate(&categories()).is_ok(), "{} should pass", ok);
        }
        for bad in ["0", "3", "62", "605", "abc", "-5"] {
            assert!(
                matches!(filled(bad).validate(&categories()), Err(FormError::InvalidMinutes(_))),
                "{} should fail",
                bad
            );
        }
    }

    #[test]
    fn test_member_and_category_required() {
        let mut form = OfflineForm::new("CAD");
        assert_eq!(form.validate(&categories()), Err(FormError::MissingMember));

        form.member_id = "M1".into();
        form.category = "Gaming".into();
        assert_eq!(form.validate(&categories()), Err(FormError::UnknownCategory("Gaming".into())));
    }

    #[test]
    fn test_blank_note_is_omitted() {
        let submission = filled("45").validate(&categories()).unwrap();
        assert_eq!(submission.note, None);
        assert_eq!(submission.minutes, Some(45));
    }

    #[test]
    fn test_submit_skips_network_on_invalid_form() {
        let transport = Rc::new(ScriptedTransport::default());
        let vm = StudentViewModel::new(
            ApiClient::new("https://gas.example", "2024-25", transport.clone()),
            categories(),
        );

        let err = block_on(vm.submit("GP", &filled("7"))).unwrap_err();
        assert!(matches!(err, SubmitError::Form(_)));
        assert!(transport.requests.borrow().is_empty());

        transport.push_ok(json!({ "status": "pending_approval", "session_id": "S3" }));
        let receipt = block_on(vm.submit("GP", &filled("30"))).unwrap();
        assert_eq!(receipt.session_id, "S3");
        assert_eq!(transport.requests.borrow()[0].1["team_id"], "GP");
    }

    #[test]
    fn test_eligible_members_and_history_line() {
        let roster: Vec<Member> = serde_json::from_value(json!([
            { "member_id": "M1", "first_name": "Ada", "last_initial": "L", "active_state": "clocked_in" },
            { "member_id": "M2", "first_name": "Old", "last_initial": "X", "active_state": "unknown" }
        ]))
        .unwrap();
        let eligible = eligible_members(&roster);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].member_id, "M1");

        let entry = OfflineHistoryEntry {
            session_id: "S1".into(),
            kind: crate::models::SessionKind::Offline,
            category: None,
            minutes: Some(30),
            start_ts: None,
            end_ts: None,
            status: OfflineStatus::PendingApproval,
            note: None,
        };
        assert_eq!(history_line(&entry), "Offline work · 30 minutes · pending approval");
    }
}
