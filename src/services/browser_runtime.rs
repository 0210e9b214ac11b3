// ============================================================================
// BROWSER RUNTIME - reloj, red y timers reales para la cola offline
// ============================================================================

use futures::future::LocalBoxFuture;
use gloo_timers::callback::Timeout;
use wasm_bindgen::JsValue;

use crate::config::AppConfig;
use crate::services::api_client::ApiClient;
use crate::services::http_transport::FetchTransport;
use crate::services::network_monitor::{self, NetworkMonitor};
use crate::services::offline_queue::{ApiToggleSender, OfflineQueue, QueueEvent, QueueRuntime, RetryPolicy};
use crate::services::offline_service::LocalQueueStore;

pub const QUEUE_FLUSHED_EVENT: &str = "queue:flushed";

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserRuntime;

impl QueueRuntime for BrowserRuntime {
    type Timer = Timeout;
    type Watch = Option<NetworkMonitor>;

    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }

    fn is_online(&self) -> bool {
        network_monitor::is_online()
    }

    fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> Timeout {
        let millis = u32::try_from(delay_ms).unwrap_or(u32::MAX);
        Timeout::new(millis, task)
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn watch_online(&self, on_online: Box<dyn Fn()>) -> Option<NetworkMonitor> {
        match NetworkMonitor::on_online(on_online) {
            Ok(monitor) => Some(monitor),
            Err(e) => {
                log::warn!("⚠️ No se pudo escuchar eventos de red: {:?}", e);
                None
            }
        }
    }
}

pub type BrowserApi = ApiClient<FetchTransport>;
pub type BrowserQueue = OfflineQueue<LocalQueueStore, ApiToggleSender<FetchTransport>, BrowserRuntime>;

pub fn create_api(config: &AppConfig) -> BrowserApi {
    ApiClient::new(&config.api_base_url, &config.season_id, FetchTransport)
}

/// Cola de la página: cada entrega se anuncia en window como `queue:flushed`
pub fn create_queue(config: &AppConfig, api: &BrowserApi) -> BrowserQueue {
    let queue = OfflineQueue::new(
        LocalQueueStore::new(&config.queue.storage_key),
        ApiToggleSender::new(api.clone()),
        BrowserRuntime,
        RetryPolicy::from_config(&config.queue),
    );
    queue.subscribe(|event| {
        if let QueueEvent::Flushed { .. } = event {
            if let Err(e) = dispatch_window_event(QUEUE_FLUSHED_EVENT) {
                log::warn!("⚠️ No se pudo emitir {}: {:?}", QUEUE_FLUSHED_EVENT, e);
            }
        }
    });
    queue
}

pub fn dispatch_window_event(name: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let event = web_sys::CustomEvent::new(name)?;
    window.dispatch_event(&event).map(|_| ())
}
