use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::actions::{CredentialRefresher, ExecutorRegistry};
use crate::config::Config;
use crate::connectivity::ConnectivityProbe;
use crate::error::StoreError;
use crate::models::action::{Action, ActionType};
use crate::notify::{CacheInvalidator, ChangeNotifier, Subscription};
use crate::store::ActionStore;
use crate::worker::{self, PassOutcome};

pub type SharedOutbox = Arc<Outbox>;

/// The mutation delivery engine: one instance per process, constructed by
/// [`crate::build_outbox`] and passed wherever it is needed.
///
/// Owns the persisted queue and every injected capability. All methods
/// take `&self`; the processor's single-flight guard is the only
/// synchronization the queue needs.
pub struct Outbox {
    pub(crate) store: ActionStore,
    pub(crate) executors: ExecutorRegistry,
    pub(crate) refresher: Arc<dyn CredentialRefresher>,
    pub(crate) connectivity: Arc<dyn ConnectivityProbe>,
    pub(crate) invalidator: Arc<dyn CacheInvalidator>,
    pub(crate) notifier: ChangeNotifier,
    pub(crate) config: Config,
    pub(crate) pass_lock: Mutex<()>,
}

impl Outbox {
    /// Append an action to the durable queue and run a processing attempt.
    /// The attempt is a no-op while offline or while a pass is running.
    pub async fn enqueue(
        &self,
        action_type: ActionType,
        payload: serde_json::Value,
    ) -> Result<Uuid, StoreError> {
        let action = Action::new(action_type, payload);
        let id = action.id;
        self.store.append(action).await?;
        tracing::debug!("Enqueued action {id} ({action_type})");
        self.notifier.notify(self.store.count().await);
        self.process_queue().await;
        Ok(id)
    }

    /// Ordered snapshot of the pending queue, for diagnostics.
    pub async fn queue(&self) -> Vec<Action> {
        self.store.read_all().await
    }

    pub async fn pending_count(&self) -> usize {
        self.store.count().await
    }

    /// Register a pending-count listener.
    pub fn subscribe(&self, listener: impl Fn(usize) + Send + Sync + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    /// Discard all pending actions unconditionally. Operator escape hatch.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await?;
        self.notifier.notify(0);
        tracing::info!("Action queue cleared");
        Ok(())
    }

    /// Run one processing pass. Idempotent with the connectivity trigger:
    /// overlapping invocations return [`PassOutcome::AlreadyRunning`].
    pub async fn process_queue(&self) -> PassOutcome {
        worker::run_pass(self).await
    }
}
