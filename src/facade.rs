use uuid::Uuid;

use crate::error::{RemoteError, StoreError};
use crate::models::action::ActionType;
use crate::queue::Outbox;

/// Why a mutation was rolled back.
#[derive(Debug)]
pub enum MutationError {
    /// The online execution failed. Online-path failures are never
    /// enqueued; deferred delivery is the queue's job for actions that
    /// were deliberately enqueued offline.
    Remote(RemoteError),
    /// The offline enqueue itself failed; the action is not queued.
    Storage(StoreError),
}

impl std::fmt::Display for MutationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationError::Remote(err) => write!(f, "{err}"),
            MutationError::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MutationError {}

/// Typed outcome of one [`Outbox::mutate`] call. Callers apply their
/// optimistic update before calling and reverse it on `RolledBack`.
#[derive(Debug)]
pub enum MutationOutcome {
    /// Executed immediately against the remote.
    Executed(serde_json::Value),
    /// Appended to the durable queue for later delivery.
    Queued { id: Uuid },
    /// Neither executed nor queued; reverse the optimistic update.
    RolledBack(MutationError),
}

impl Outbox {
    /// Per-call mutation wrapper: execute immediately when online, enqueue
    /// for deferred delivery when offline (or connected without
    /// reachability). Each invocation is independent; no state carries
    /// across calls.
    pub async fn mutate(
        &self,
        action_type: ActionType,
        payload: serde_json::Value,
    ) -> MutationOutcome {
        if self.connectivity.check().await.is_online() {
            return self.execute_online(action_type, payload).await;
        }

        match self.enqueue(action_type, payload).await {
            Ok(id) => MutationOutcome::Queued { id },
            Err(err) => {
                tracing::warn!("Failed to enqueue {action_type} mutation: {err}");
                MutationOutcome::RolledBack(MutationError::Storage(err))
            }
        }
    }

    async fn execute_online(
        &self,
        action_type: ActionType,
        payload: serde_json::Value,
    ) -> MutationOutcome {
        let Some(executor) = self.executors.get(action_type) else {
            return MutationOutcome::RolledBack(MutationError::Remote(RemoteError::Other {
                message: format!("no executor registered for {action_type}"),
            }));
        };

        match tokio::time::timeout(self.config.execute_timeout, executor.execute(&payload)).await {
            Ok(Ok(result)) => MutationOutcome::Executed(result),
            Ok(Err(err)) => {
                tracing::warn!("Online {action_type} mutation failed: {err}");
                MutationOutcome::RolledBack(MutationError::Remote(err))
            }
            Err(_) => {
                let err = RemoteError::Timeout {
                    message: format!(
                        "execution timed out after {}s",
                        self.config.execute_timeout.as_secs()
                    ),
                };
                tracing::warn!("Online {action_type} mutation timed out");
                MutationOutcome::RolledBack(MutationError::Remote(err))
            }
        }
    }
}
