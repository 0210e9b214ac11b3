// ============================================================================
// COLA OFFLINE DE TOGGLES
// ============================================================================
// Toggles pedidos sin conexión: se guardan en orden, se persisten en cada
// cambio y se reenvían de uno en uno (FIFO) con backoff hasta que el
// servidor los confirma. Storage, envío y runtime (reloj, red, timers)
// se inyectan para poder tener varias instancias (y tests) aisladas.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;

use crate::config::QueueConfig;
use crate::models::PendingToggle;
use crate::services::api_client::{ApiClient, ApiError, HttpTransport};
use crate::state::reactivity::{SubscriptionId, Subscribers};

/// Almacenamiento durable de la cola (un único string JSON)
pub trait QueueStore: 'static {
    fn load(&self) -> Result<Option<String>, String>;
    fn save(&self, raw: &str) -> Result<(), String>;
}

/// Envío remoto de un toggle, con `toggle.id` como token de idempotencia
#[allow(async_fn_in_trait)]
pub trait ToggleSender: 'static {
    async fn send_toggle(&self, toggle: &PendingToggle) -> Result<(), ApiError>;
}

/// Entorno de ejecución de la cola.
/// `Timer` y `Watch` cancelan su tarea / listener al hacer drop.
pub trait QueueRuntime: 'static {
    type Timer: 'static;
    type Watch: 'static;

    fn now_ms(&self) -> i64;
    fn is_online(&self) -> bool;
    fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> Self::Timer;
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
    fn watch_online(&self, on_online: Box<dyn Fn()>) -> Self::Watch;
}

/// Backoff de reintentos.
/// El delay crece con la antigüedad de la entrada y con los intentos
/// fallidos (lo que sea mayor), siempre dentro de [min, max].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms: max_delay_ms.max(min_delay_ms),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.min_retry_delay_ms, config.max_retry_delay_ms)
    }

    pub fn min_delay_ms(&self) -> u64 {
        self.min_delay_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    pub fn delay_ms(&self, age_ms: u64, attempts: u32) -> u64 {
        let exponent = attempts.saturating_sub(1).min(20);
        let by_attempts = self.min_delay_ms.saturating_mul(1u64 << exponent);
        age_ms
            .max(by_attempts)
            .clamp(self.min_delay_ms, self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

/// Eventos que la cola publica a sus observers
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued { id: String, len: usize },
    Flushed { id: String, remaining: usize },
    RetryScheduled { id: String, delay_ms: u64, attempts: u32 },
}

/// Resultado de un intento de flush
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    Delivered { id: String, remaining: usize },
    Failed { id: String, delay_ms: u64, error: ApiError },
    Offline,
    Empty,
    /// Ya hay un flush en curso
    Busy,
    Disposed,
}

struct Inner<S, T, R: QueueRuntime> {
    store: S,
    sender: T,
    runtime: R,
    policy: RetryPolicy,
    entries: RefCell<Vec<PendingToggle>>,
    in_flight: Cell<bool>,
    disposed: Cell<bool>,
    retry: RefCell<Option<R::Timer>>,
    watch: RefCell<Option<R::Watch>>,
    events: Subscribers<QueueEvent>,
}

/// Cola offline (instancia explícita, compartida vía Rc)
pub struct OfflineQueue<S, T, R: QueueRuntime> {
    inner: Rc<Inner<S, T, R>>,
}

impl<S, T, R: QueueRuntime> Clone for OfflineQueue<S, T, R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S, T, R> OfflineQueue<S, T, R>
where
    S: QueueStore,
    T: ToggleSender,
    R: QueueRuntime,
{
    /// Crea la cola leyendo el storage una única vez.
    /// Datos ausentes o corruptos = cola vacía.
    pub fn new(store: S, sender: T, runtime: R, policy: RetryPolicy) -> Self {
        let entries = load_entries(&store);
        if !entries.is_empty() {
            log::info!("📋 Cola offline restaurada: {} toggles pendientes", entries.len());
        }

        Self {
            inner: Rc::new(Inner {
                store,
                sender,
                runtime,
                policy,
                entries: RefCell::new(entries),
                in_flight: Cell::new(false),
                disposed: Cell::new(false),
                retry: RefCell::new(None),
                watch: RefCell::new(None),
                events: Subscribers::new(),
            }),
        }
    }

    /// Escucha la vuelta de conexión e intenta vaciar lo que quedó
    /// de sesiones anteriores.
    pub fn start(&self) {
        if self.inner.disposed.get() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let watch = self.inner.runtime.watch_online(Box::new(move || {
            if let Some(queue) = Self::upgrade(&weak) {
                queue.handle_online();
            }
        }));
        *self.inner.watch.borrow_mut() = Some(watch);
        self.spawn_drain();
    }

    /// Encola un toggle, lo persiste y lanza un flush (no-op si offline)
    pub fn enqueue(&self, member_id: &str, team_id: &str) -> PendingToggle {
        let toggle = PendingToggle::new(
            uuid::Uuid::new_v4().to_string(),
            member_id,
            team_id,
            self.inner.runtime.now_ms(),
        );

        let len = {
            let mut entries = self.inner.entries.borrow_mut();
            entries.push(toggle.clone());
            entries.len()
        };
        self.persist();

        log::info!("📥 Toggle encolado {} ({}), {} en cola", member_id, team_id, len);
        self.inner.events.notify(&QueueEvent::Enqueued { id: toggle.id.clone(), len });

        self.spawn_drain();
        toggle
    }

    /// Intenta enviar la cabeza de la cola
    pub async fn flush(&self) -> FlushOutcome {
        let inner = &self.inner;
        if inner.disposed.get() {
            return FlushOutcome::Disposed;
        }
        if inner.in_flight.get() {
            return FlushOutcome::Busy;
        }
        if !inner.runtime.is_online() {
            return FlushOutcome::Offline;
        }
        let head = inner.entries.borrow().first().cloned();
        let Some(head) = head else {
            return FlushOutcome::Empty;
        };

        let result = {
            let _guard = InFlight::enter(&inner.in_flight);
            // un intento nuevo sustituye al reintento pendiente
            inner.retry.borrow_mut().take();
            inner.sender.send_toggle(&head).await
        };

        match result {
            Ok(()) => {
                let remaining = {
                    let mut entries = inner.entries.borrow_mut();
                    entries.retain(|t| t.id != head.id);
                    entries.len()
                };
                self.persist();

                log::info!("✅ Toggle {} confirmado, quedan {}", head.id, remaining);
                inner.events.notify(&QueueEvent::Flushed { id: head.id.clone(), remaining });
                FlushOutcome::Delivered { id: head.id, remaining }
            }
            Err(error) => {
                let attempts = {
                    let mut entries = inner.entries.borrow_mut();
                    match entries.iter_mut().find(|t| t.id == head.id) {
                        Some(entry) => {
                            entry.attempts = entry.attempts.saturating_add(1);
                            entry.attempts
                        }
                        None => head.attempts.saturating_add(1),
                    }
                };
                self.persist();

                let age = head.age_ms(inner.runtime.now_ms());
                let delay_ms = inner.policy.delay_ms(age, attempts);

                if error.is_transient() {
                    log::warn!("⚠️ Toggle {} falló ({}), reintento en {} ms", head.id, error, delay_ms);
                } else {
                    log::warn!("⚠️ Toggle {} rechazado: {}, reintento en {} ms", head.id, error, delay_ms);
                }

                if !inner.disposed.get() {
                    self.schedule_retry(delay_ms);
                    inner.events.notify(&QueueEvent::RetryScheduled {
                        id: head.id.clone(),
                        delay_ms,
                        attempts,
                    });
                }

                FlushOutcome::Failed { id: head.id, delay_ms, error }
            }
        }
    }

    /// Flush repetido mientras haya entregas; devuelve cuántas hubo
    pub async fn drain(&self) -> usize {
        let mut delivered = 0;
        while let FlushOutcome::Delivered { .. } = self.flush().await {
            delivered += 1;
        }
        delivered
    }

    /// Vuelta de conexión: flush inmediato, sin esperar al timer
    pub fn handle_online(&self) {
        log::info!("🌐 Conexión recuperada, {} toggles en cola", self.len());
        self.spawn_drain();
    }

    /// Libera timer y listener; la cola queda inerte
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.retry.borrow_mut().take();
        self.inner.watch.borrow_mut().take();
        self.inner.events.clear();
        log::info!("🔌 Cola offline liberada");
    }

    pub fn pending(&self) -> Vec<PendingToggle> {
        self.inner.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_online(&self) -> bool {
        self.inner.runtime.is_online()
    }

    pub fn has_retry_scheduled(&self) -> bool {
        self.inner.retry.borrow().is_some()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.inner.policy
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&QueueEvent) + 'static,
    {
        self.inner.events.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.events.unsubscribe(id);
    }

    fn upgrade(weak: &Weak<Inner<S, T, R>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn spawn_drain(&self) {
        if self.inner.disposed.get() {
            return;
        }
        let queue = self.clone();
        self.inner.runtime.spawn(Box::pin(async move {
            queue.drain().await;
        }));
    }

    /// Único slot de reintento: programar uno nuevo cancela el anterior
    fn schedule_retry(&self, delay_ms: u64) {
        let weak = Rc::downgrade(&self.inner);
        let timer = self.inner.runtime.schedule(
            delay_ms,
            Box::new(move || {
                if let Some(queue) = Self::upgrade(&weak) {
                    // timer gastado: el slot queda libre antes del drain
                    queue.inner.retry.borrow_mut().take();
                    queue.spawn_drain();
                }
            }),
        );
        *self.inner.retry.borrow_mut() = Some(timer);
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&*self.inner.entries.borrow()) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("❌ Error serializando cola: {}", e);
                return;
            }
        };
        if let Err(e) = self.inner.store.save(&raw) {
            log::error!("❌ Error guardando cola: {}", e);
        }
    }
}

fn load_entries<S: QueueStore>(store: &S) -> Vec<PendingToggle> {
    match store.load() {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<PendingToggle>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("⚠️ Cola guardada ilegible, se descarta: {}", e);
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            log::warn!("⚠️ No se pudo leer la cola guardada: {}", e);
            Vec::new()
        }
    }
}

/// Envía los toggles encolados con el endpoint `session.toggle`
pub struct ApiToggleSender<H> {
    api: ApiClient<H>,
}

impl<H: HttpTransport> ApiToggleSender<H> {
    pub fn new(api: ApiClient<H>) -> Self {
        Self { api }
    }
}

impl<H: HttpTransport> ToggleSender for ApiToggleSender<H> {
    async fn send_toggle(&self, toggle: &PendingToggle) -> Result<(), ApiError> {
        self.api
            .toggle(&toggle.team_id, &toggle.member_id, &toggle.id)
            .await
            .map(|_| ())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use futures::executor::{block_on, LocalPool};

    fn offline_setup() -> (LocalPool, MemoryStore, ScriptedSender, ManualRuntime) {
        let pool = LocalPool::new();
        let runtime = ManualRuntime::new(pool.spawner(), false);
        (pool, MemoryStore::default(), ScriptedSender::default(), runtime)
    }

    #[test]
    fn test_enqueued_entries_survive_reload_in_order() {
        let (mut pool, store, sender, runtime) = offline_setup();
        let queue = test_queue(&store, &sender, &runtime);

        let ids: Vec<String> = [("M1", "GP"), ("M2", "GP"), ("M1", "BH"), ("M1", "GP")]
            .iter()
            .map(|(m, t)| {
                runtime.advance(1_000);
                queue.enqueue(m, t).id
            })
            .collect();
        pool.run_until_stalled();
        assert!(sender.sent.borrow().is_empty());

        let before = queue.pending();
        queue.dispose();

        let reloaded = test_queue(&store, &sender, &runtime);
        assert_eq!(reloaded.pending(), before);
        let reloaded_ids: Vec<String> = reloaded.pending().into_iter().map(|t| t.id).collect();
        assert_eq!(reloaded_ids, ids);
    }

    #[test]
    fn test_failed_flush_keeps_head_and_length() {
        let (_pool, store, sender, runtime) = offline_setup();
        let queue = test_queue(&store, &sender, &runtime);
        let head = queue.enqueue("M1", "GP");
        queue.enqueue("M2", "GP");

        runtime.online.set(true);
        sender.fail_next(5);
        for attempt in 1..=5u32 {
            let outcome = block_on(queue.flush());
            assert!(matches!(outcome, FlushOutcome::Failed { ref id, .. } if *id == head.id));
            assert_eq!(queue.len(), 2);
            assert_eq!(queue.pending()[0].id, head.id);
            assert_eq!(queue.pending()[0].attempts, attempt);
        }
        // nunca se intentó otra entrada fuera de orden
        assert!(sender.sent.borrow().iter().all(|t| t.id == head.id));
    }

    #[test]
    fn test_back_online_drains_with_entry_ids_as_tokens() {
        let (mut pool, store, sender, runtime) = offline_setup();
        let queue = test_queue(&store, &sender, &runtime);
        queue.start();

        let ids: Vec<String> = (1..=3).map(|n| queue.enqueue(&format!("M{}", n), "GP").id).collect();
        pool.run_until_stalled();
        assert_eq!(queue.len(), 3);

        runtime.go_online();
        pool.run_until_stalled();

        assert!(queue.is_empty());
        assert_eq!(sender.sent_ids(), ids);
        assert_eq!(store.raw.borrow().as_deref(), Some("[]"));
    }

    #[test]
    fn test_retry_delay_bounds_and_monotonic_in_age() {
        let policy = RetryPolicy::new(2_000, 60_000);
        let mut last = 0;
        for age in (0..200_000u64).step_by(1_500) {
            let delay = policy.delay_ms(age, 1);
            assert!(delay >= last);
            assert!((2_000..=60_000).contains(&delay));
            last = delay;
        }
        assert_eq!(policy.delay_ms(0, 1), 2_000);
        assert_eq!(policy.delay_ms(10_000, 1), 10_000);
        assert_eq!(policy.delay_ms(0, 3), 8_000);
        assert_eq!(policy.delay_ms(0, 40), 60_000);
        assert_eq!(RetryPolicy::new(9_000, 1_000).min_delay_ms(), 1_000);
    }

    #[test]
    fn test_reload_then_online_flush_notifies_once() {
        let (mut pool, store, sender, runtime) = offline_setup();
        let first = test_queue(&store, &sender, &runtime);
        let toggle = first.enqueue("M1", "GP");
        pool.run_until_stalled();
        first.dispose();

        let queue = test_queue(&store, &sender, &runtime);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending()[0].member_id, "M1");
        assert_eq!(queue.pending()[0].team_id, "GP");

        let flushed = Rc::new(Cell::new(0));
        let counter = flushed.clone();
        queue.subscribe(move |event| {
            if let QueueEvent::Flushed { remaining, .. } = event {
                assert_eq!(*remaining, 0);
                counter.set(counter.get() + 1);
            }
        });
        queue.start();
        runtime.go_online();
        pool.run_until_stalled();

        assert!(queue.is_empty());
        assert_eq!(flushed.get(), 1);
        assert_eq!(sender.sent_ids(), vec![toggle.id]);
    }

    #[test]
    fn test_single_retry_slot_and_timer_replays_head() {
        let (mut pool, store, sender, runtime) = offline_setup();
        runtime.online.set(true);
        let queue = test_queue(&store, &sender, &runtime);

        sender.fail_next(2);
        queue.enqueue("M1", "GP");
        pool.run_until_stalled();
        assert_eq!(runtime.live_timers(), 1);

        // un flush manual que falla reemplaza el timer en vez de sumar otro
        runtime.advance(3_000);
        assert!(matches!(block_on(queue.flush()), FlushOutcome::Failed { .. }));
        assert_eq!(runtime.live_timers(), 1);

        assert_eq!(runtime.fire_next(), Some(4_000));
        pool.run_until_stalled();
        assert!(queue.is_empty());
        assert!(!queue.has_retry_scheduled());
        assert_eq!(runtime.live_timers(), 0);
    }

    #[test]
    fn test_back_online_flushes_without_waiting_for_retry_timer() {
        let (mut pool, store, sender, runtime) = offline_setup();
        runtime.online.set(true);
        let queue = test_queue(&store, &sender, &runtime);
        queue.start();
        pool.run_until_stalled();

        sender.fail_next(1);
        let head = queue.enqueue("M1", "GP");
        pool.run_until_stalled();
        assert!(queue.has_retry_scheduled());
        assert_eq!(runtime.live_timers(), 1);

        runtime.go_offline();
        runtime.go_online();
        pool.run_until_stalled();

        // reenviado al volver la red, sin disparar el timer
        assert_eq!(sender.sent_ids(), vec![head.id.clone(), head.id]);
        assert_eq!(runtime.live_timers(), 0);
        assert!(!queue.has_retry_scheduled());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fired_retry_timer_frees_the_slot() {
        let (mut pool, store, sender, runtime) = offline_setup();
        runtime.online.set(true);
        let queue = test_queue(&store, &sender, &runtime);

        sender.fail_next(1);
        queue.enqueue("M1", "GP");
        pool.run_until_stalled();
        assert!(queue.has_retry_scheduled());

        // dispara sin red: el flush es no-op pero el slot ya no tiene timer
        runtime.go_offline();
        assert_eq!(runtime.fire_next(), Some(2_000));
        pool.run_until_stalled();
        assert!(!queue.has_retry_scheduled());
        assert_eq!(runtime.live_timers(), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_offline_and_empty_flush_are_noops() {
        let (_pool, store, sender, runtime) = offline_setup();
        let queue = test_queue(&store, &sender, &runtime);
        assert_eq!(block_on(queue.flush()), FlushOutcome::Offline);

        runtime.online.set(true);
        assert_eq!(block_on(queue.flush()), FlushOutcome::Empty);
        assert!(!queue.has_retry_scheduled());
    }

    #[test]
    fn test_concurrent_flush_reports_busy() {
        struct HangingSender;
        impl ToggleSender for HangingSender {
            async fn send_toggle(&self, _toggle: &PendingToggle) -> Result<(), ApiError> {
                futures::future::pending::<()>().await;
                Ok(())
            }
        }

        let mut pool = LocalPool::new();
        let runtime = ManualRuntime::new(pool.spawner(), true);
        let queue = OfflineQueue::new(MemoryStore::default(), HangingSender, runtime, RetryPolicy::default());
        queue.enqueue("M1", "GP");
        pool.run_until_stalled();

        assert_eq!(block_on(queue.flush()), FlushOutcome::Busy);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_corrupt_storage_is_treated_as_empty() {
        let pool = LocalPool::new();
        let runtime = ManualRuntime::new(pool.spawner(), false);
        let sender = ScriptedSender::default();

        for raw in ["{not json", r#"{"id":"x"}"#, "null"] {
            let queue = test_queue(&MemoryStore::with_raw(raw), &sender, &runtime);
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_dispose_releases_timer_and_watch() {
        let (mut pool, store, sender, runtime) = offline_setup();
        runtime.online.set(true);
        let queue = test_queue(&store, &sender, &runtime);
        queue.start();
        // un intento del start y otro del enqueue
        sender.fail_next(2);
        queue.enqueue("M1", "GP");
        pool.run_until_stalled();
        assert!(runtime.is_watching());
        assert_eq!(runtime.live_timers(), 1);

        queue.dispose();
        assert!(!runtime.is_watching());
        assert_eq!(runtime.live_timers(), 0);
        assert_eq!(block_on(queue.flush()), FlushOutcome::Disposed);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_api_sender_uses_entry_id_as_client_ref() {
        use crate::services::api_client::testing::ScriptedTransport;

        let transport = Rc::new(ScriptedTransport::default());
        transport.push_ok(serde_json::json!({ "state": "clocked_out", "session_id": "S1" }));
        let sender = ApiToggleSender::new(ApiClient::new("https://gas.example", "2024-25", transport.clone()));

        let toggle = PendingToggle::new("tok-1".into(), "M1", "GP", 0);
        block_on(sender.send_toggle(&toggle)).unwrap();
        assert_eq!(transport.requests.borrow()[0].1["client_ref"], "tok-1");
    }
}
