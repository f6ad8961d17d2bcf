use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::actions::ActionExecutor;
use crate::classify::{ErrorKind, classify};
use crate::config::Config;
use crate::error::RemoteError;
use crate::models::action::Action;
use crate::queue::Outbox;
use crate::retry::should_retry;

/// Result of asking the processor for a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pass ran over a snapshot of the queue.
    Completed(PassSummary),
    /// Offline or explicitly unreachable; nothing was consumed.
    Offline,
    /// Another pass holds the single-flight guard.
    AlreadyRunning,
}

/// Per-disposition counts for one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub conflicts: usize,
    pub retried: usize,
    pub failed_permanently: usize,
    pub remaining: usize,
}

enum Disposition {
    Succeeded,
    ConflictResolved,
    RetryScheduled,
    PermanentFailure,
}

/// Drain the queue once: execute each snapshotted action in enqueue order,
/// classify failures, and write the surviving list back in a single commit.
///
/// Passes never overlap: the try-lock guard turns concurrent invocations
/// into immediate no-ops, and its drop clears the flag on every exit path.
pub(crate) async fn run_pass(outbox: &Outbox) -> PassOutcome {
    let Ok(_guard) = outbox.pass_lock.try_lock() else {
        tracing::debug!("Queue pass already running, skipping");
        return PassOutcome::AlreadyRunning;
    };

    if !outbox.connectivity.check().await.is_online() {
        tracing::debug!("Offline, leaving the action queue untouched");
        return PassOutcome::Offline;
    }

    let snapshot = outbox.store.read_all().await;
    if snapshot.is_empty() {
        return PassOutcome::Completed(PassSummary::default());
    }

    let snapshot_ids: HashSet<Uuid> = snapshot.iter().map(|a| a.id).collect();
    let mut summary = PassSummary {
        attempted: snapshot.len(),
        ..Default::default()
    };
    let mut survivors = Vec::new();
    let mut resolved_any = false;

    for mut action in snapshot {
        match process_action(outbox, &mut action).await {
            Disposition::Succeeded => {
                summary.succeeded += 1;
                resolved_any = true;
            }
            Disposition::ConflictResolved => {
                summary.conflicts += 1;
                resolved_any = true;
            }
            Disposition::RetryScheduled => {
                summary.retried += 1;
                survivors.push(action);
            }
            Disposition::PermanentFailure => {
                summary.failed_permanently += 1;
            }
        }
    }

    let removed = summary.attempted - summary.retried;
    summary.remaining = outbox.store.commit_pass(&snapshot_ids, survivors).await;

    if resolved_any {
        outbox.invalidator.invalidate_caches().await;
    }
    if removed > 0 {
        outbox.notifier.notify(summary.remaining);
    }

    tracing::debug!(
        "Queue pass complete: {} attempted, {} succeeded, {} conflicts, {} retried, {} permanent, {} remaining",
        summary.attempted,
        summary.succeeded,
        summary.conflicts,
        summary.retried,
        summary.failed_permanently,
        summary.remaining
    );

    PassOutcome::Completed(summary)
}

async fn process_action(outbox: &Outbox, action: &mut Action) -> Disposition {
    let Some(executor) = outbox.executors.get(action.action_type) else {
        action.record_failure(
            format!("no executor registered for {}", action.action_type),
            ErrorKind::Validation,
        );
        tracing::error!(
            "No executor registered for action type {}, discarding action {}",
            action.action_type,
            action.id
        );
        return Disposition::PermanentFailure;
    };
    let executor = Arc::clone(executor);

    match execute_with_timeout(&outbox.config, &executor, action).await {
        Ok(_) => {
            tracing::debug!("Action {} ({}) delivered", action.id, action.action_type);
            Disposition::Succeeded
        }
        Err(err) => handle_failure(outbox, &executor, action, err).await,
    }
}

async fn handle_failure(
    outbox: &Outbox,
    executor: &Arc<dyn ActionExecutor>,
    action: &mut Action,
    err: RemoteError,
) -> Disposition {
    match classify(&err) {
        ErrorKind::Conflict => {
            tracing::info!(
                "Action {} ({}) already satisfied remotely, resolving as success",
                action.id,
                action.action_type
            );
            Disposition::ConflictResolved
        }
        ErrorKind::Auth => handle_auth_failure(outbox, executor, action, err).await,
        ErrorKind::Validation => {
            action.record_failure(err.to_string(), ErrorKind::Validation);
            tracing::error!("Action {} rejected by the remote, discarding: {err}", action.id);
            Disposition::PermanentFailure
        }
        kind => {
            action.record_failure(err.to_string(), kind);
            if should_retry(kind, action, &outbox.config) {
                action.retry_count += 1;
                tracing::warn!(
                    "Action {} failed ({kind}), retry {}/{} scheduled: {err}",
                    action.id,
                    action.retry_count,
                    outbox.config.max_retries
                );
                Disposition::RetryScheduled
            } else {
                tracing::error!(
                    "Action {} failed ({kind}) with retries exhausted, discarding: {err}",
                    action.id
                );
                Disposition::PermanentFailure
            }
        }
    }
}

/// At most one credential refresh followed by one re-execution, gated by
/// the auth retry counter. A failed refresh consumes the cycle the same
/// way a failed re-execution does.
async fn handle_auth_failure(
    outbox: &Outbox,
    executor: &Arc<dyn ActionExecutor>,
    action: &mut Action,
    err: RemoteError,
) -> Disposition {
    if action.auth_retry_count >= outbox.config.auth_retry_limit {
        action.record_failure(err.to_string(), ErrorKind::Auth);
        tracing::error!(
            "Action {} unauthorized with auth retries exhausted, discarding",
            action.id
        );
        return Disposition::PermanentFailure;
    }

    let renewed = match outbox.refresher.refresh().await {
        Ok(()) => execute_with_timeout(&outbox.config, executor, action).await,
        Err(refresh_err) => Err(refresh_err),
    };

    match renewed {
        Ok(_) => {
            tracing::debug!("Action {} delivered after credential refresh", action.id);
            Disposition::Succeeded
        }
        Err(renewed_err) => {
            let kind = classify(&renewed_err);
            if kind == ErrorKind::Conflict {
                tracing::info!(
                    "Action {} already satisfied remotely after refresh, resolving as success",
                    action.id
                );
                return Disposition::ConflictResolved;
            }
            action.auth_retry_count += 1;
            action.record_failure(renewed_err.to_string(), kind);
            if action.auth_retry_count < outbox.config.auth_retry_limit {
                tracing::warn!(
                    "Action {} still failing after credential refresh, keeping for retry: {renewed_err}",
                    action.id
                );
                Disposition::RetryScheduled
            } else {
                tracing::error!(
                    "Action {} still failing after credential refresh, discarding: {renewed_err}",
                    action.id
                );
                Disposition::PermanentFailure
            }
        }
    }
}

async fn execute_with_timeout(
    config: &Config,
    executor: &Arc<dyn ActionExecutor>,
    action: &Action,
) -> Result<serde_json::Value, RemoteError> {
    match tokio::time::timeout(config.execute_timeout, executor.execute(&action.payload)).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout {
            message: format!(
                "execution timed out after {}s",
                config.execute_timeout.as_secs()
            ),
        }),
    }
}
