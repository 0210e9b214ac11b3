// ============================================================================
// FTC ATTENDANCE KIOSK - FRONTEND MVVM (RUST PURO + WASM)
// ============================================================================
// Arquitectura MVVM:
// - Views: Funciones que renderizan DOM (sin lógica)
// - ViewModels: Lógica UI, testeable fuera del navegador
// - Services: API, cola offline, caché del service worker
// - State: State Management con Rc<RefCell>
// - Models: Estructuras compartidas con el backend
// ============================================================================
// El mismo .wasm corre en la página (main) y en el service worker
// (start_service_worker).
// ============================================================================

pub mod config;
pub mod models;
pub mod services;
pub mod state;
pub mod viewmodels;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod views;

#[cfg(target_arch = "wasm32")]
pub use wasm_entry::*;

#[cfg(target_arch = "wasm32")]
mod wasm_entry {
    use std::cell::RefCell;

    use wasm_bindgen::prelude::*;

    use crate::app::App;
    use crate::config::CONFIG;
    use crate::services::service_worker::ShellServiceWorker;

    // Instancia global de la app (sólo en la página)
    thread_local! {
        static APP: RefCell<Option<App>> = RefCell::new(None);
    }

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        let level = if CONFIG.is_logging_enabled() { log::Level::Info } else { log::Level::Warn };
        wasm_logger::init(wasm_logger::Config::new(level));

        // En el service worker no hay window: allí arranca start_service_worker
        if web_sys::window().is_none() {
            return Ok(());
        }
        log::info!("🚀 FTC Attendance - temporada {}", CONFIG.season_id);

        let mut app = App::new()?;
        app.render()?;
        APP.with(|cell| *cell.borrow_mut() = Some(app));

        APP.with(|cell| match cell.borrow_mut().as_mut() {
            Some(app) => app.start(),
            None => Ok(()),
        })
    }

    /// Re-render completo del root
    pub fn rerender_app() {
        APP.with(|cell| {
            // Un render en curso ya pinta el estado más reciente
            let Ok(mut slot) = cell.try_borrow_mut() else {
                return;
            };
            if let Some(app) = slot.as_mut() {
                if let Err(e) = app.render() {
                    log::error!("❌ Error renderizando: {:?}", e);
                }
            }
        });
    }

    /// Punto de entrada del service worker (sw.js lo llama tras cargar el wasm)
    #[wasm_bindgen]
    pub fn start_service_worker() -> Result<ShellServiceWorker, JsValue> {
        ShellServiceWorker::new(&CONFIG.shell)
    }
}
