pub mod actions;
pub mod classify;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod facade;
pub mod models;
pub mod notify;
pub mod queue;
pub mod retry;
pub mod store;
pub mod worker;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::actions::{CredentialRefresher, ExecutorRegistry};
use crate::config::Config;
use crate::connectivity::ConnectivityProbe;
use crate::notify::{CacheInvalidator, ChangeNotifier};
use crate::queue::{Outbox, SharedOutbox};
use crate::store::{ActionStore, KeyValueStore};

/// Assemble the delivery engine from its injected capabilities.
///
/// Construct one instance at process start and share the handle; pair it
/// with [`connectivity::watch_connectivity`] to re-drive the queue on
/// reconnection.
pub fn build_outbox(
    kv: Arc<dyn KeyValueStore>,
    executors: ExecutorRegistry,
    refresher: Arc<dyn CredentialRefresher>,
    connectivity: Arc<dyn ConnectivityProbe>,
    invalidator: Arc<dyn CacheInvalidator>,
    config: Config,
) -> SharedOutbox {
    let store = ActionStore::new(kv, config.queue_key.clone());

    Arc::new(Outbox {
        store,
        executors,
        refresher,
        connectivity,
        invalidator,
        notifier: ChangeNotifier::new(),
        config,
        pass_lock: Mutex::new(()),
    })
}
