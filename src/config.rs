use std::time::Duration;

/// Engine tuning knobs. `Default` gives the production values; `from_env`
/// lets a deployment override them without code changes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on general (network/server/unknown/timeout) retries
    /// per action before it is discarded as a permanent failure.
    pub max_retries: u32,
    /// Upper bound on credential-refresh-and-retry cycles per action.
    pub auth_retry_limit: u32,
    /// Storage key the serialized queue lives under.
    pub queue_key: String,
    /// Deadline applied to each remote execution attempt.
    pub execute_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 3,
            auth_retry_limit: 1,
            queue_key: "outboxer.queue".to_string(),
            execute_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Config::default();

        let max_retries: u32 = env_or("OUTBOXER_MAX_RETRIES", &defaults.max_retries.to_string())
            .parse()
            .map_err(|e| format!("Invalid OUTBOXER_MAX_RETRIES: {e}"))?;

        let auth_retry_limit: u32 = env_or(
            "OUTBOXER_AUTH_RETRY_LIMIT",
            &defaults.auth_retry_limit.to_string(),
        )
        .parse()
        .map_err(|e| format!("Invalid OUTBOXER_AUTH_RETRY_LIMIT: {e}"))?;

        let queue_key = env_or("OUTBOXER_QUEUE_KEY", &defaults.queue_key);

        let timeout_secs: u64 = env_or(
            "OUTBOXER_EXECUTE_TIMEOUT_SECS",
            &defaults.execute_timeout.as_secs().to_string(),
        )
        .parse()
        .map_err(|e| format!("Invalid OUTBOXER_EXECUTE_TIMEOUT_SECS: {e}"))?;

        Ok(Config {
            max_retries,
            auth_retry_limit,
            queue_key,
            execute_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
