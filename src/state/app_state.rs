// ============================================================================
// APP STATE - Estado global de la aplicación
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::AppConfig;
use crate::models::{Member, OfflineHistoryEntry, PendingToggle, StatusBoard};
use crate::state::reactivity::{SubscriptionId, Subscribers};
use crate::viewmodels::admin_viewmodel::HistoryFilter;
use crate::viewmodels::student_viewmodel::OfflineForm;

/// Vistas de la app (hash routing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Kiosk,
    Student,
    Admin,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Kiosk, Route::Student, Route::Admin];

    /// `#/student` -> Student; cualquier otra cosa cae en el kiosk
    pub fn from_hash(hash: &str) -> Self {
        let path = hash.trim_start_matches('#').trim_start_matches('/');
        let path = path.split(['?', '/']).next().unwrap_or_default();
        match path {
            "student" => Route::Student,
            "admin" => Route::Admin,
            _ => Route::Kiosk,
        }
    }

    pub fn hash(&self) -> &'static str {
        match self {
            Route::Kiosk => "#/kiosk",
            Route::Student => "#/student",
            Route::Admin => "#/admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::Kiosk => "Kiosk",
            Route::Student => "Student",
            Route::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Mensaje para el usuario tras una acción
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into() }
    }
}

/// Error de un toggle online: se ofrece reintentar sobre el mismo miembro
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleFailure {
    pub member_id: String,
    pub message: String,
}

/// Estado global de la aplicación
#[derive(Clone)]
pub struct AppState {
    pub route: Rc<RefCell<Route>>,
    pub online: Rc<RefCell<bool>>,
    pub queued: Rc<RefCell<usize>>,

    // Kiosk
    pub team_id: Rc<RefCell<String>>,
    pub roster: Rc<RefCell<Vec<Member>>>,
    pub board: Rc<RefCell<StatusBoard>>,
    pub search: Rc<RefCell<String>>,
    pub loading: Rc<RefCell<bool>>,
    pub kiosk_error: Rc<RefCell<Option<ToggleFailure>>>,
    pub load_error: Rc<RefCell<Option<String>>>,

    // Student
    pub student_team: Rc<RefCell<String>>,
    pub student_roster: Rc<RefCell<Vec<Member>>>,
    pub form: Rc<RefCell<OfflineForm>>,
    pub student_history: Rc<RefCell<Vec<OfflineHistoryEntry>>>,
    pub student_notice: Rc<RefCell<Option<Notice>>>,
    pub submitting: Rc<RefCell<bool>>,

    // Admin
    pub admin_team: Rc<RefCell<String>>,
    pub admin_roster: Rc<RefCell<Vec<Member>>>,
    pub admin_board: Rc<RefCell<StatusBoard>>,
    pub selected_member: Rc<RefCell<Option<String>>>,
    pub admin_history: Rc<RefCell<Vec<OfflineHistoryEntry>>>,
    pub history_filter: Rc<RefCell<HistoryFilter>>,
    pub csv_text: Rc<RefCell<String>>,
    pub admin_notice: Rc<RefCell<Option<Notice>>>,
    pub admin_busy: Rc<RefCell<bool>>,

    pub change_subscribers: Rc<Subscribers<()>>,
}

impl AppState {
    /// `remembered_team` sólo se usa si sigue configurado
    pub fn new(config: &AppConfig, remembered_team: Option<String>) -> Self {
        let default_team = config.default_team_id().unwrap_or_default().to_string();
        let team_id = remembered_team
            .filter(|team| config.team_name(team).is_some())
            .unwrap_or_else(|| default_team.clone());
        let default_category = config
            .offline_categories
            .first()
            .map(String::as_str)
            .unwrap_or("Other");

        Self {
            route: Rc::new(RefCell::new(Route::default())),
            online: Rc::new(RefCell::new(true)),
            queued: Rc::new(RefCell::new(0)),

            team_id: Rc::new(RefCell::new(team_id)),
            roster: Rc::new(RefCell::new(Vec::new())),
            board: Rc::new(RefCell::new(StatusBoard::new())),
            search: Rc::new(RefCell::new(String::new())),
            loading: Rc::new(RefCell::new(false)),
            kiosk_error: Rc::new(RefCell::new(None)),
            load_error: Rc::new(RefCell::new(None)),

            student_team: Rc::new(RefCell::new(default_team.clone())),
            student_roster: Rc::new(RefCell::new(Vec::new())),
            form: Rc::new(RefCell::new(OfflineForm::new(default_category))),
            student_history: Rc::new(RefCell::new(Vec::new())),
            student_notice: Rc::new(RefCell::new(None)),
            submitting: Rc::new(RefCell::new(false)),

            admin_team: Rc::new(RefCell::new(default_team)),
            admin_roster: Rc::new(RefCell::new(Vec::new())),
            admin_board: Rc::new(RefCell::new(StatusBoard::new())),
            selected_member: Rc::new(RefCell::new(None)),
            admin_history: Rc::new(RefCell::new(Vec::new())),
            history_filter: Rc::new(RefCell::new(HistoryFilter::default())),
            csv_text: Rc::new(RefCell::new(String::new())),
            admin_notice: Rc::new(RefCell::new(None)),
            admin_busy: Rc::new(RefCell::new(false)),

            change_subscribers: Rc::new(Subscribers::new()),
        }
    }

    /// Suscribirse a cambios de estado
    pub fn subscribe_to_changes<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + 'static,
    {
        self.change_subscribers.subscribe(move |_| callback())
    }

    pub fn notify_subscribers(&self) {
        self.change_subscribers.notify(&());
    }

    pub fn set_route(&self, route: Route) {
        if *self.route.borrow() == route {
            return;
        }
        *self.route.borrow_mut() = route;
        self.notify_subscribers();
    }

    /// Cambio de equipo en el kiosk: se limpia búsqueda y datos del anterior
    pub fn set_team(&self, team_id: &str) {
        *self.team_id.borrow_mut() = team_id.to_string();
        self.search.borrow_mut().clear();
        self.roster.borrow_mut().clear();
        *self.board.borrow_mut() = StatusBoard::new();
        *self.kiosk_error.borrow_mut() = None;
        self.notify_subscribers();
    }

    pub fn set_connectivity(&self, online: bool, queued: usize) {
        let changed = *self.online.borrow() != online || *self.queued.borrow() != queued;
        *self.online.borrow_mut() = online;
        *self.queued.borrow_mut() = queued;
        if changed {
            self.notify_subscribers();
        }
    }

    /// Overlay optimista de un toggle encolado (sólo si es del equipo visible)
    pub fn apply_queued_toggle(&self, toggle: &PendingToggle) {
        if *self.team_id.borrow() == toggle.team_id {
            self.board.borrow_mut().apply_optimistic_toggle(toggle);
        }
        *self.kiosk_error.borrow_mut() = None;
        self.notify_subscribers();
    }

    /// El servidor aceptó un toggle de la cola; el estado confirmado llega
    /// con el siguiente snapshot
    pub fn settle_toggle(&self, toggle_id: &str, remaining: usize) {
        self.board.borrow_mut().settle(toggle_id);
        *self.queued.borrow_mut() = remaining;
        self.notify_subscribers();
    }

    pub fn team(&self) -> String {
        self.team_id.borrow().clone()
    }
}
