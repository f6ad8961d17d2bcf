use crate::classify::ErrorKind;
use crate::config::Config;
use crate::models::action::Action;

/// Decide whether a failed action stays in the queue for another pass.
///
/// Transient kinds (network, server, timeout, unknown) retry until the
/// general counter hits `max_retries`. Auth retries are bounded separately
/// by `auth_retry_limit` and only happen after a credential refresh.
/// Conflict means the intent is already satisfied server-side; validation
/// is a permanent client-side failure. Neither is ever retried.
pub fn should_retry(kind: ErrorKind, action: &Action, config: &Config) -> bool {
    match kind {
        ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Server | ErrorKind::Unknown => {
            action.retry_count < config.max_retries
        }
        ErrorKind::Auth => action.auth_retry_count < config.auth_retry_limit,
        ErrorKind::Conflict | ErrorKind::Validation => false,
    }
}
