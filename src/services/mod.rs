pub mod api_client;
pub mod offline_queue;
pub mod shell_cache;

#[cfg(target_arch = "wasm32")]
pub mod browser_runtime;
#[cfg(target_arch = "wasm32")]
pub mod http_transport;
#[cfg(target_arch = "wasm32")]
pub mod network_monitor;
#[cfg(target_arch = "wasm32")]
pub mod offline_service;
#[cfg(target_arch = "wasm32")]
pub mod service_worker;

pub use api_client::{ApiClient, ApiError, HttpReply, HttpTransport};
pub use offline_queue::{
    ApiToggleSender, FlushOutcome, OfflineQueue, QueueEvent, QueueRuntime, QueueStore, RetryPolicy,
    ToggleSender,
};
pub use shell_cache::{FetchPlan, ShellCacheBackend, ShellWorker};
