// ============================================================================
// SHELL CACHE - lógica del service worker (install / activate / fetch)
// ============================================================================
// Una sola generación de cache viva. Las peticiones GET del mismo origen
// se sirven desde cache si existe copia y se refrescan en segundo plano;
// el resto pasa directo a la red.
// ============================================================================

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::config::ShellConfig;

pub trait WorkerRequest {
    fn method(&self) -> String;
    fn url(&self) -> String;
}

pub trait WorkerResponse: Sized {
    fn status(&self) -> u16;
    /// Copia independiente (un body sólo se puede consumir una vez)
    fn duplicate(&self) -> Result<Self, String>;

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status())
    }
}

/// Cache storage + red + ciclo de vida del worker
#[allow(async_fn_in_trait)]
pub trait ShellCacheBackend: 'static {
    type Request: WorkerRequest + Clone + 'static;
    type Response: WorkerResponse + 'static;

    async fn fetch_url(&self, url: &str) -> Result<Self::Response, String>;
    async fn fetch(&self, request: &Self::Request) -> Result<Self::Response, String>;
    async fn cache_names(&self) -> Result<Vec<String>, String>;
    async fn delete_cache(&self, name: &str) -> Result<bool, String>;
    async fn lookup(&self, cache: &str, url: &str) -> Result<Option<Self::Response>, String>;
    async fn store(&self, cache: &str, url: &str, response: Self::Response) -> Result<(), String>;
    async fn skip_waiting(&self) -> Result<(), String>;
    async fn claim_clients(&self) -> Result<(), String>;
}

/// Respuesta para la página + trabajo pendiente de cache (waitUntil)
pub struct FetchPlan<Res> {
    pub response: Res,
    pub revalidate: Option<LocalBoxFuture<'static, ()>>,
}

pub struct ShellWorker<B> {
    backend: Rc<B>,
    cache_name: String,
    precache_urls: Vec<String>,
    origin: String,
}

impl<B: ShellCacheBackend> ShellWorker<B> {
    pub fn new(backend: B, config: &ShellConfig, origin: &str) -> Self {
        Self {
            backend: Rc::new(backend),
            cache_name: config.cache_name.clone(),
            precache_urls: config.precache_urls.clone(),
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Precarga todo el shell o falla entero
    pub async fn install(&self) -> Result<(), String> {
        let mut fetched = Vec::with_capacity(self.precache_urls.len());
        for url in &self.precache_urls {
            let response = self
                .backend
                .fetch_url(url)
                .await
                .map_err(|e| format!("Precache {} falló: {}", url, e))?;
            if !response.is_success() {
                return Err(format!("Precache {} falló: HTTP {}", url, response.status()));
            }
            fetched.push((url, response));
        }

        for (url, response) in fetched {
            self.backend.store(&self.cache_name, url, response).await?;
        }
        log::info!("📦 Shell precargado en {} ({} recursos)", self.cache_name, self.precache_urls.len());

        self.backend.skip_waiting().await
    }

    /// Borra toda generación distinta de la actual y toma control de las páginas.
    /// Devuelve cuántas generaciones se borraron.
    pub async fn activate(&self) -> Result<usize, String> {
        let names = self.backend.cache_names().await?;
        let mut deleted = 0;
        for name in names.iter().filter(|name| **name != self.cache_name) {
            if self.backend.delete_cache(name).await? {
                log::info!("🗑️ Cache antigua eliminada: {}", name);
                deleted += 1;
            }
        }
        self.backend.claim_clients().await?;
        Ok(deleted)
    }

    /// Sólo GET del mismo origen
    pub fn intercepts(&self, request: &B::Request) -> bool {
        request.method().eq_ignore_ascii_case("GET") && is_same_origin(&request.url(), &self.origin)
    }

    /// `None` = no se intercepta, la petición sigue su curso normal
    pub async fn handle_fetch(&self, request: B::Request) -> Result<Option<FetchPlan<B::Response>>, String> {
        if !self.intercepts(&request) {
            return Ok(None);
        }
        self.respond(request).await.map(Some)
    }

    /// Stale-while-revalidate: copia en cache si existe (la red sólo la
    /// refresca), si no la respuesta de red. Sin copia y sin red, error.
    pub async fn respond(&self, request: B::Request) -> Result<FetchPlan<B::Response>, String> {
        let url = request.url();
        let cached = match self.backend.lookup(&self.cache_name, &url).await {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("⚠️ Lookup en cache falló para {}: {}", url, e);
                None
            }
        };

        if let Some(cached) = cached {
            return Ok(FetchPlan {
                response: cached,
                revalidate: Some(self.refresh(request)),
            });
        }

        let live = self.backend.fetch(&request).await?;
        let revalidate = if live.is_success() {
            match live.duplicate() {
                Ok(copy) => Some(self.store_later(url, copy)),
                Err(e) => {
                    log::warn!("⚠️ No se pudo clonar la respuesta de {}: {}", url, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(FetchPlan { response: live, revalidate })
    }

    fn refresh(&self, request: B::Request) -> LocalBoxFuture<'static, ()> {
        let backend = self.backend.clone();
        let cache_name = self.cache_name.clone();
        Box::pin(async move {
            let url = request.url();
            match backend.fetch(&request).await {
                Ok(fresh) if fresh.is_success() => {
                    if let Err(e) = backend.store(&cache_name, &url, fresh).await {
                        log::warn!("⚠️ No se pudo actualizar cache de {}: {}", url, e);
                    }
                }
                Ok(fresh) => log::warn!("⚠️ {} respondió {}, se mantiene la copia", url, fresh.status()),
                Err(e) => log::warn!("📴 Sin red para {}, se mantiene la copia: {}", url, e),
            }
        })
    }

    fn store_later(&self, url: String, response: B::Response) -> LocalBoxFuture<'static, ()> {
        let backend = self.backend.clone();
        let cache_name = self.cache_name.clone();
        Box::pin(async move {
            if let Err(e) = backend.store(&cache_name, &url, response).await {
                log::warn!("⚠️ No se pudo guardar {} en cache: {}", url, e);
            }
        })
    }
}

/// `https://a.b/x` pertenece a `https://a.b`; `https://a.b.evil/x` no
fn is_same_origin(url: &str, origin: &str) -> bool {
    match url.strip_prefix(origin) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, HashMap, HashSet};

    const ORIGIN: &str = "https://kiosk.example.org";

    #[derive(Debug, Clone, PartialEq)]
    struct FakeResponse {
        status: u16,
        body: String,
    }

    impl FakeResponse {
        fn ok(body: &str) -> Self {
            Self { status: 200, body: body.to_string() }
        }
    }

    impl WorkerResponse for FakeResponse {
        fn status(&self) -> u16 {
            self.status
        }

        fn duplicate(&self) -> Result<Self, String> {
            Ok(self.clone())
        }
    }

    #[derive(Debug, Clone)]
    struct FakeRequest {
        method: String,
        url: String,
    }

    fn get(path: &str) -> FakeRequest {
        FakeRequest { method: "GET".into(), url: format!("{}{}", ORIGIN, path) }
    }

    impl WorkerRequest for FakeRequest {
        fn method(&self) -> String {
            self.method.clone()
        }

        fn url(&self) -> String {
            self.url.clone()
        }
    }

    /// Como la Cache API: "/x" y "https://origen/x" son la misma entrada
    fn cache_key(url: &str) -> &str {
        match url.strip_prefix(ORIGIN) {
            Some("") => "/",
            Some(path) => path,
            None => url,
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        caches: RefCell<BTreeMap<String, BTreeMap<String, FakeResponse>>>,
        network: RefCell<HashMap<String, FakeResponse>>,
        hanging: RefCell<HashSet<String>>,
        fetches: Cell<usize>,
        skipped_waiting: Cell<bool>,
        claimed: Cell<bool>,
    }

    impl FakeBackend {
        fn serve(&self, url: &str, response: FakeResponse) {
            self.network.borrow_mut().insert(url.to_string(), response);
        }

        fn cached(&self, cache: &str, url: &str) -> Option<FakeResponse> {
            self.caches.borrow().get(cache).and_then(|c| c.get(cache_key(url)).cloned())
        }

        async fn network(&self, url: &str) -> Result<FakeResponse, String> {
            self.fetches.set(self.fetches.get() + 1);
            if self.hanging.borrow().contains(url) {
                futures::future::pending::<()>().await;
            }
            self.network
                .borrow()
                .get(url)
                .cloned()
                .ok_or_else(|| "TypeError: Failed to fetch".to_string())
        }
    }

    impl ShellCacheBackend for Rc<FakeBackend> {
        type Request = FakeRequest;
        type Response = FakeResponse;

        async fn fetch_url(&self, url: &str) -> Result<FakeResponse, String> {
            self.network(url).await
        }

        async fn fetch(&self, request: &FakeRequest) -> Result<FakeResponse, String> {
            self.network(&request.url).await
        }

        async fn cache_names(&self) -> Result<Vec<String>, String> {
            Ok(self.caches.borrow().keys().cloned().collect())
        }

        async fn delete_cache(&self, name: &str) -> Result<bool, String> {
            Ok(self.caches.borrow_mut().remove(name).is_some())
        }

        async fn lookup(&self, cache: &str, url: &str) -> Result<Option<FakeResponse>, String> {
            Ok(self.cached(cache, url))
        }

        async fn store(&self, cache: &str, url: &str, response: FakeResponse) -> Result<(), String> {
            self.caches
                .borrow_mut()
                .entry(cache.to_string())
                .or_default()
                .insert(cache_key(url).to_string(), response);
            Ok(())
        }

        async fn skip_waiting(&self) -> Result<(), String> {
            self.skipped_waiting.set(true);
            Ok(())
        }

        async fn claim_clients(&self) -> Result<(), String> {
            self.claimed.set(true);
            Ok(())
        }
    }

    fn worker(cache_name: &str) -> (ShellWorker<Rc<FakeBackend>>, Rc<FakeBackend>) {
        let backend = Rc::new(FakeBackend::default());
        let config = ShellConfig {
            cache_name: cache_name.to_string(),
            precache_urls: vec!["/".into(), "/manifest.webmanifest".into()],
        };
        (ShellWorker::new(backend.clone(), &config, ORIGIN), backend)
    }

    #[test]
    fn test_install_is_all_or_nothing() {
        let (worker, backend) = worker("shell-v2");
        backend.serve("/", FakeResponse::ok("<html>"));

        assert!(block_on(worker.install()).is_err());
        assert!(backend.caches.borrow().is_empty());
        assert!(!backend.skipped_waiting.get());

        backend.serve("/manifest.webmanifest", FakeResponse::ok("{}"));
        block_on(worker.install()).unwrap();
        assert_eq!(backend.cached("shell-v2", "/"), Some(FakeResponse::ok("<html>")));
        assert!(backend.skipped_waiting.get());
    }

    #[test]
    fn test_cold_start_offline_serves_precached_shell_and_module() {
        let backend = Rc::new(FakeBackend::default());
        let config = ShellConfig::default();
        for url in &config.precache_urls {
            backend.serve(url, FakeResponse::ok(url));
        }
        block_on(ShellWorker::new(backend.clone(), &config, ORIGIN).install()).unwrap();

        // worker parado por inactividad y sin red: instancia nueva, misma cache
        backend.network.borrow_mut().clear();
        let cold = ShellWorker::new(backend.clone(), &config, ORIGIN);
        for path in ["/", "/index.html", "/pkg/attendance_kiosk.js", "/pkg/attendance_kiosk_bg.wasm"] {
            let plan = block_on(cold.respond(get(path))).unwrap();
            assert_eq!(plan.response.body, path);
        }
    }

    #[test]
    fn test_activate_keeps_only_current_generation() {
        let (worker, backend) = worker("shell-v2");
        for name in ["shell-v1", "shell-v2", "other-v0"] {
            backend.caches.borrow_mut().insert(name.to_string(), BTreeMap::new());
        }

        let deleted = block_on(worker.activate()).unwrap();
        assert_eq!(deleted, 2);
        let names: Vec<String> = backend.caches.borrow().keys().cloned().collect();
        assert_eq!(names, vec!["shell-v2".to_string()]);
        assert!(backend.claimed.get());
    }

    #[test]
    fn test_cached_copy_returned_before_network_resolves() {
        let (worker, backend) = worker("shell-v2");
        let request = get("/index.html");
        block_on(backend.store("shell-v2", &request.url, FakeResponse::ok("stale"))).unwrap();
        backend.hanging.borrow_mut().insert(request.url.clone());

        let plan = block_on(worker.handle_fetch(request)).unwrap().unwrap();
        assert_eq!(plan.response.body, "stale");
        assert!(plan.revalidate.is_some());
    }

    #[test]
    fn test_background_refresh_updates_cache() {
        let (worker, backend) = worker("shell-v2");
        let request = get("/app.js");
        block_on(backend.store("shell-v2", &request.url, FakeResponse::ok("old"))).unwrap();
        backend.serve(&request.url, FakeResponse::ok("new"));

        let plan = block_on(worker.respond(request.clone())).unwrap();
        assert_eq!(plan.response.body, "old");
        block_on(plan.revalidate.unwrap());
        assert_eq!(backend.cached("shell-v2", &request.url), Some(FakeResponse::ok("new")));
    }

    #[test]
    fn test_miss_goes_to_network_and_caches_success_only() {
        let (worker, backend) = worker("shell-v2");
        let ok = get("/icon.png");
        let missing = get("/missing");
        backend.serve(&ok.url, FakeResponse::ok("png"));
        backend.serve(&missing.url, FakeResponse { status: 404, body: "nope".into() });

        let plan = block_on(worker.respond(ok.clone())).unwrap();
        assert_eq!(plan.response.body, "png");
        block_on(plan.revalidate.unwrap());
        assert!(backend.cached("shell-v2", &ok.url).is_some());

        let plan = block_on(worker.respond(missing.clone())).unwrap();
        assert_eq!(plan.response.status, 404);
        assert!(plan.revalidate.is_none());
        assert!(backend.cached("shell-v2", &missing.url).is_none());

        // sin copia y sin red: el error llega a la página
        assert!(block_on(worker.respond(get("/offline"))).is_err());
    }

    #[test]
    fn test_non_get_and_cross_origin_pass_through() {
        let (worker, backend) = worker("shell-v2");
        let post = FakeRequest { method: "POST".into(), url: format!("{}/api/session.toggle", ORIGIN) };
        let foreign = FakeRequest {
            method: "GET".into(),
            url: "https://kiosk.example.org.evil.test/index.html".into(),
        };
        let api = FakeRequest {
            method: "GET".into(),
            url: "https://script.google.com/macros/s/X/exec".into(),
        };

        for request in [post, foreign, api] {
            backend.serve(&request.url, FakeResponse::ok("live"));
            assert!(block_on(worker.handle_fetch(request.clone())).unwrap().is_none());
            assert!(backend.cached("shell-v2", &request.url).is_none());
        }
        assert_eq!(backend.fetches.get(), 0);
        assert!(worker.intercepts(&get("/")));
        assert!(worker.intercepts(&FakeRequest { method: "GET".into(), url: ORIGIN.into() }));
    }
}
