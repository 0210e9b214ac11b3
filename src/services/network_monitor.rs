// ============================================================================
// MONITOR DE ESTADO DE RED
// ============================================================================
// Eventos online/offline de window. El monitor es dueño de sus closures:
// al hacer drop se quitan los listeners.
// ============================================================================

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Event, Window};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NetworkStatus {
    Online,
    Offline,
    Unknown,
}

/// Estado actual según `navigator.onLine`
pub fn current_status() -> NetworkStatus {
    match window().map(|w| w.navigator().on_line()) {
        Some(true) => NetworkStatus::Online,
        Some(false) => NetworkStatus::Offline,
        None => NetworkStatus::Unknown,
    }
}

/// Unknown cuenta como online: se intenta y, si falla, backoff
pub fn is_online() -> bool {
    current_status() != NetworkStatus::Offline
}

pub struct NetworkMonitor {
    window: Window,
    online: Closure<dyn FnMut(Event)>,
    offline: Closure<dyn FnMut(Event)>,
}

impl NetworkMonitor {
    /// Registra los listeners; viven mientras viva el monitor
    pub fn watch<F>(callback: F) -> Result<Self, JsValue>
    where
        F: Fn(NetworkStatus) + 'static,
    {
        let window = window().ok_or_else(|| JsValue::from_str("No window"))?;
        let callback = std::rc::Rc::new(callback);

        let online = Closure::wrap(Box::new({
            let callback = callback.clone();
            move |_event: Event| {
                log::info!("🌐 Network: ONLINE");
                callback(NetworkStatus::Online);
            }
        }) as Box<dyn FnMut(Event)>);

        let offline = Closure::wrap(Box::new({
            let callback = callback.clone();
            move |_event: Event| {
                log::warn!("📴 Network: OFFLINE");
                callback(NetworkStatus::Offline);
            }
        }) as Box<dyn FnMut(Event)>);

        window.add_event_listener_with_callback("online", online.as_ref().unchecked_ref())?;
        window.add_event_listener_with_callback("offline", offline.as_ref().unchecked_ref())?;

        Ok(Self { window, online, offline })
    }

    /// Sólo la vuelta de conexión
    pub fn on_online<F>(callback: F) -> Result<Self, JsValue>
    where
        F: Fn() + 'static,
    {
        Self::watch(move |status| {
            if status == NetworkStatus::Online {
                callback();
            }
        })
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("online", self.online.as_ref().unchecked_ref());
        let _ = self
            .window
            .remove_event_listener_with_callback("offline", self.offline.as_ref().unchecked_ref());
        log::info!("🔌 Network monitor dropped");
    }
}
