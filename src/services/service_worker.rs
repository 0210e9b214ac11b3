// ============================================================================
// SERVICE WORKER - bindings web-sys para ShellWorker
// ============================================================================
// Se ejecuta dentro del ServiceWorkerGlobalScope: sw.js carga el wasm y
// obtiene un ShellServiceWorker con `start_service_worker`.
// ============================================================================

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{Cache, CacheStorage, FetchEvent, Request, Response, ServiceWorkerGlobalScope};

use crate::config::ShellConfig;
use crate::services::shell_cache::{ShellCacheBackend, ShellWorker, WorkerRequest, WorkerResponse};

fn js_error(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

impl WorkerRequest for Request {
    fn method(&self) -> String {
        Request::method(self)
    }

    fn url(&self) -> String {
        Request::url(self)
    }
}

impl WorkerResponse for Response {
    fn status(&self) -> u16 {
        Response::status(self)
    }

    fn duplicate(&self) -> Result<Self, String> {
        Response::clone(self).map_err(js_error)
    }
}

pub struct WebCacheBackend {
    scope: ServiceWorkerGlobalScope,
}

impl WebCacheBackend {
    pub fn new(scope: ServiceWorkerGlobalScope) -> Self {
        Self { scope }
    }

    fn caches(&self) -> Result<CacheStorage, String> {
        self.scope.caches().map_err(js_error)
    }

    async fn open(&self, name: &str) -> Result<Cache, String> {
        let cache = JsFuture::from(self.caches()?.open(name)).await.map_err(js_error)?;
        cache.dyn_into::<Cache>().map_err(js_error)
    }
}

async fn worker_fetch(request: &Request) -> Result<Response, JsValue> {
    let scope: ServiceWorkerGlobalScope = js_sys::global().dyn_into()?;
    let value = JsFuture::from(scope.fetch_with_request(request)).await?;
    value.dyn_into::<Response>()
}

async fn into_response(promise: js_sys::Promise) -> Result<Response, String> {
    let value = JsFuture::from(promise).await.map_err(js_error)?;
    value.dyn_into::<Response>().map_err(js_error)
}

impl ShellCacheBackend for WebCacheBackend {
    type Request = Request;
    type Response = Response;

    async fn fetch_url(&self, url: &str) -> Result<Response, String> {
        into_response(self.scope.fetch_with_str(url)).await
    }

    async fn fetch(&self, request: &Request) -> Result<Response, String> {
        into_response(self.scope.fetch_with_request(request)).await
    }

    async fn cache_names(&self) -> Result<Vec<String>, String> {
        let keys = JsFuture::from(self.caches()?.keys()).await.map_err(js_error)?;
        Ok(js_sys::Array::from(&keys)
            .iter()
            .filter_map(|key| key.as_string())
            .collect())
    }

    async fn delete_cache(&self, name: &str) -> Result<bool, String> {
        let deleted = JsFuture::from(self.caches()?.delete(name)).await.map_err(js_error)?;
        Ok(deleted.as_bool().unwrap_or(false))
    }

    async fn lookup(&self, cache: &str, url: &str) -> Result<Option<Response>, String> {
        let cache = self.open(cache).await?;
        let found = JsFuture::from(cache.match_with_str(url)).await.map_err(js_error)?;
        if found.is_undefined() || found.is_null() {
            return Ok(None);
        }
        found.dyn_into::<Response>().map(Some).map_err(js_error)
    }

    async fn store(&self, cache: &str, url: &str, response: Response) -> Result<(), String> {
        let cache = self.open(cache).await?;
        JsFuture::from(cache.put_with_str(url, &response))
            .await
            .map(|_| ())
            .map_err(js_error)
    }

    async fn skip_waiting(&self) -> Result<(), String> {
        let promise = self.scope.skip_waiting().map_err(js_error)?;
        JsFuture::from(promise).await.map(|_| ()).map_err(js_error)
    }

    async fn claim_clients(&self) -> Result<(), String> {
        JsFuture::from(self.scope.clients().claim())
            .await
            .map(|_| ())
            .map_err(js_error)
    }
}

/// Handle que usa sw.js. Los listeners se registran en JS durante la
/// evaluación inicial del script y esperan a que el wasm cargue.
#[wasm_bindgen]
pub struct ShellServiceWorker {
    worker: Rc<ShellWorker<WebCacheBackend>>,
}

impl ShellServiceWorker {
    pub fn new(config: &ShellConfig) -> Result<Self, JsValue> {
        let scope: ServiceWorkerGlobalScope = js_sys::global().dyn_into()?;
        let origin = scope.location().origin();
        let worker = ShellWorker::new(WebCacheBackend::new(scope), config, &origin);
        log::info!("🛠️ Service worker listo (cache {})", worker.cache_name());
        Ok(Self { worker: Rc::new(worker) })
    }
}

#[wasm_bindgen]
impl ShellServiceWorker {
    /// Promise para `event.waitUntil` del install
    pub fn install(&self) -> js_sys::Promise {
        let worker = self.worker.clone();
        future_to_promise(async move {
            worker.install().await.map_err(|e| {
                log::error!("❌ Install del shell falló: {}", e);
                JsValue::from_str(&e)
            })?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn activate(&self) -> js_sys::Promise {
        let worker = self.worker.clone();
        future_to_promise(async move {
            let deleted = worker.activate().await.map_err(|e| JsValue::from_str(&e))?;
            if deleted > 0 {
                log::info!("🧹 {} cachés antiguas eliminadas", deleted);
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Promise para `event.respondWith`. sw.js sólo la pide para GET del
    /// mismo origen, también cuando el evento llegó antes de cargar el wasm.
    pub fn respond(&self, event: FetchEvent) -> js_sys::Promise {
        let request = event.request();
        let worker = self.worker.clone();
        future_to_promise(async move {
            if !worker.intercepts(&request) {
                let live = worker_fetch(&request).await?;
                return Ok(live.into());
            }
            let plan = worker.respond(request).await.map_err(|e| JsValue::from_str(&e))?;
            if let Some(revalidate) = plan.revalidate {
                let background = future_to_promise(async move {
                    revalidate.await;
                    Ok(JsValue::UNDEFINED)
                });
                // respondWith sigue pendiente: todavía se puede extender el evento
                let _ = event.wait_until(&background);
            }
            Ok(plan.response.into())
        })
    }
}
