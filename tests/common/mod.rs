use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use outboxer::actions::{ActionExecutor, CredentialRefresher, ExecutorRegistry};
use outboxer::config::Config;
use outboxer::connectivity::{Connectivity, ConnectivityProbe};
use outboxer::error::{RemoteError, StoreError};
use outboxer::models::action::ActionType;
use outboxer::notify::CacheInvalidator;
use outboxer::queue::SharedOutbox;
use outboxer::store::{KeyValueStore, MemoryKv};

/// Executor that replays scripted results in order and records every
/// payload it is called with. Once the script is exhausted it succeeds
/// with `null`.
pub struct ScriptedExecutor {
    results: Mutex<VecDeque<Result<serde_json::Value, RemoteError>>>,
    payloads: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedExecutor {
    pub fn ok() -> Arc<Self> {
        Self::with(vec![])
    }

    pub fn with(results: Vec<Result<serde_json::Value, RemoteError>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, result: Result<serde_json::Value, RemoteError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionExecutor for ScriptedExecutor {
    async fn execute(&self, payload: &serde_json::Value) -> Result<serde_json::Value, RemoteError> {
        self.payloads.lock().unwrap().push(payload.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(serde_json::Value::Null))
    }
}

/// Executor that sleeps before succeeding, for single-flight tests.
pub struct SlowExecutor {
    pub delay: Duration,
}

#[async_trait]
impl ActionExecutor for SlowExecutor {
    async fn execute(&self, _payload: &serde_json::Value) -> Result<serde_json::Value, RemoteError> {
        tokio::time::sleep(self.delay).await;
        Ok(serde_json::Value::Null)
    }
}

/// Refresher that replays scripted results; succeeds once exhausted.
pub struct ScriptedRefresher {
    results: Mutex<VecDeque<Result<(), RemoteError>>>,
    calls: AtomicUsize,
}

impl ScriptedRefresher {
    pub fn ok() -> Arc<Self> {
        Self::with(vec![])
    }

    pub fn with(results: Vec<Result<(), RemoteError>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialRefresher for ScriptedRefresher {
    async fn refresh(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Settable connectivity probe.
pub struct TestConnectivity {
    state: Mutex<Connectivity>,
}

impl TestConnectivity {
    pub fn new(state: Connectivity) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn set(&self, state: Connectivity) {
        *self.state.lock().unwrap() = state;
    }
}

#[async_trait]
impl ConnectivityProbe for TestConnectivity {
    async fn check(&self) -> Connectivity {
        *self.state.lock().unwrap()
    }
}

/// Counts invalidation calls.
#[derive(Default)]
pub struct CountingInvalidator {
    calls: AtomicUsize,
}

impl CountingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheInvalidator for CountingInvalidator {
    async fn invalidate_caches(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Key-value store whose writes can be made to fail, for enqueue-failure
/// paths.
pub struct FailingKv {
    inner: MemoryKv,
    fail_writes: AtomicBool,
}

impl FailingKv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKv::new(),
            fail_writes: AtomicBool::new(false),
        })
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FailingKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("storage full".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }
}

/// An assembled engine with handles to every fake it was built from.
pub struct TestOutbox {
    pub outbox: SharedOutbox,
    pub subscribe_exec: Arc<ScriptedExecutor>,
    pub unsubscribe_exec: Arc<ScriptedExecutor>,
    pub refresher: Arc<ScriptedRefresher>,
    pub connectivity: Arc<TestConnectivity>,
    pub invalidator: Arc<CountingInvalidator>,
}

pub fn spawn_outbox() -> TestOutbox {
    spawn_outbox_on(Arc::new(MemoryKv::new()), Config::default())
}

pub fn spawn_outbox_on(kv: Arc<dyn KeyValueStore>, config: Config) -> TestOutbox {
    let subscribe_exec = ScriptedExecutor::ok();
    let unsubscribe_exec = ScriptedExecutor::ok();
    let refresher = ScriptedRefresher::ok();
    let connectivity = TestConnectivity::new(Connectivity::online());
    let invalidator = CountingInvalidator::new();

    let mut executors = ExecutorRegistry::new();
    executors.register(ActionType::Subscribe, subscribe_exec.clone());
    executors.register(ActionType::Unsubscribe, unsubscribe_exec.clone());

    let outbox = outboxer::build_outbox(
        kv,
        executors,
        refresher.clone(),
        connectivity.clone(),
        invalidator.clone(),
        config,
    );

    TestOutbox {
        outbox,
        subscribe_exec,
        unsubscribe_exec,
        refresher,
        connectivity,
        invalidator,
    }
}
