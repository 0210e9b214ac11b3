// ============================================================================
// APP - Aplicación principal
// ============================================================================
// Monta los viewmodels, conecta cola / red / hash routing con el estado y
// re-renderiza el root en cada cambio.
// ============================================================================

use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Element;

use crate::config::CONFIG;
use crate::dom::{append_child, clear_children, document, get_element_by_id, location_hash, WindowListener};
use crate::services::browser_runtime::{create_api, create_queue, BrowserRuntime, QUEUE_FLUSHED_EVENT};
use crate::services::http_transport::FetchTransport;
use crate::services::network_monitor::{NetworkMonitor, NetworkStatus};
use crate::services::offline_queue::{ApiToggleSender, QueueEvent};
use crate::services::offline_service::{load_last_team, LocalQueueStore};
use crate::state::app_state::{AppState, Route};
use crate::viewmodels::{AdminViewModel, KioskViewModel, StudentViewModel};
use crate::views::{self, admin, kiosk, offline_banner, student};

pub type BrowserKiosk =
    KioskViewModel<FetchTransport, LocalQueueStore, ApiToggleSender<FetchTransport>, BrowserRuntime>;

/// Lo que necesitan las views: estado + viewmodels
#[derive(Clone)]
pub struct AppContext {
    pub state: AppState,
    pub kiosk: Rc<BrowserKiosk>,
    pub student: Rc<StudentViewModel<FetchTransport>>,
    pub admin: Rc<AdminViewModel<FetchTransport>>,
}

/// Aplicación principal
pub struct App {
    ctx: AppContext,
    root: Element,
    listeners: Vec<WindowListener>,
    network: Option<NetworkMonitor>,
    timers: Vec<Interval>,
}

impl App {
    pub fn new() -> Result<Self, JsValue> {
        let root = get_element_by_id("app").ok_or_else(|| JsValue::from_str("No #app element found"))?;
        if let Some(doc) = document() {
            doc.set_title("FTC Attendance");
        }

        let api = create_api(&CONFIG);
        let queue = create_queue(&CONFIG, &api);
        let state = AppState::new(&CONFIG, load_last_team());
        *state.route.borrow_mut() = Route::from_hash(&location_hash());
        *state.queued.borrow_mut() = queue.len();

        // Batch de updates: un render por tick
        state.subscribe_to_changes(|| {
            Timeout::new(0, crate::rerender_app).forget();
        });

        let ctx = AppContext {
            kiosk: Rc::new(KioskViewModel::new(api.clone(), queue)),
            student: Rc::new(StudentViewModel::new(api.clone(), CONFIG.offline_categories.clone())),
            admin: Rc::new(AdminViewModel::new(api)),
            state,
        };

        // Entregas de la cola: el tile sólo se confirma con el snapshot que
        // se pide al vaciarse la cola
        {
            let listener = ctx.clone();
            ctx.kiosk.queue().subscribe(move |event| match event {
                QueueEvent::Flushed { id, remaining } => {
                    listener.state.settle_toggle(id, *remaining);
                    if *remaining == 0 && *listener.state.route.borrow() == Route::Kiosk {
                        kiosk::refresh_status(&listener);
                    }
                }
                QueueEvent::RetryScheduled { id, delay_ms, attempts } => {
                    log::warn!("🔁 Toggle {} reintento #{} en {} ms", id, attempts, delay_ms);
                }
                QueueEvent::Enqueued { id, len } => {
                    log::info!("📥 Toggle {} en cola ({} pendientes)", id, len);
                }
            });
        }

        Ok(Self {
            ctx,
            root,
            listeners: Vec::new(),
            network: None,
            timers: Vec::new(),
        })
    }

    /// Arranca cola, listeners y timers. Llamar una sola vez, con APP ya guardada.
    pub fn start(&mut self) -> Result<(), JsValue> {
        self.ctx.kiosk.queue().start();

        let network = {
            let ctx = self.ctx.clone();
            NetworkMonitor::watch(move |status| {
                let queued = ctx.kiosk.queue().len();
                ctx.state.set_connectivity(status != NetworkStatus::Offline, queued);
            })
        };
        match network {
            Ok(monitor) => self.network = Some(monitor),
            Err(e) => log::warn!("⚠️ Sin eventos de red: {:?}", e),
        }

        let ctx = self.ctx.clone();
        self.listeners.push(WindowListener::new("hashchange", move |_| {
            let route = Route::from_hash(&location_hash());
            log::info!("🧭 Ruta: {}", route.label());
            ctx.state.set_route(route);
            load_route(&ctx);
        })?);

        let state = self.ctx.state.clone();
        self.listeners.push(WindowListener::new(QUEUE_FLUSHED_EVENT, move |_| {
            offline_banner::poll_connectivity(&state);
        })?);

        let state = self.ctx.state.clone();
        self.timers.push(Interval::new(CONFIG.ui.banner_poll_ms, move || {
            offline_banner::poll_connectivity(&state);
        }));

        let ctx = self.ctx.clone();
        self.timers.push(Interval::new(CONFIG.ui.status_refresh_ms, move || {
            let route = *ctx.state.route.borrow();
            match route {
                Route::Kiosk => kiosk::refresh_status(&ctx),
                Route::Admin => admin::refresh_attendance(&ctx),
                Route::Student => {}
            }
        }));

        register_service_worker();
        offline_banner::poll_connectivity(&self.ctx.state);
        load_route(&self.ctx);
        Ok(())
    }

    pub fn render(&mut self) -> Result<(), JsValue> {
        clear_children(&self.root);
        let view = views::render_app(&self.ctx)?;
        append_child(&self.root, &view)
    }
}

/// Datos de la vista activa
pub fn load_route(ctx: &AppContext) {
    let route = *ctx.state.route.borrow();
    match route {
        Route::Kiosk => kiosk::load_team(ctx),
        Route::Student => student::load(ctx),
        Route::Admin => admin::load(ctx),
    }
}

fn register_service_worker() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let promise = window.navigator().service_worker().register("/sw.js");
    wasm_bindgen_futures::spawn_local(async move {
        match JsFuture::from(promise).await {
            Ok(_) => log::info!("🛠️ Service worker registrado"),
            Err(e) => log::warn!("⚠️ Service worker no registrado: {:?}", e),
        }
    });
}
