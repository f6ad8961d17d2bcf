/// A remote execution failure, normalized at the transport boundary.
///
/// Executors convert whatever their transport raises into one of these
/// variants so classification runs on a closed type instead of probing
/// ad hoc error shapes.
#[derive(Debug, Clone)]
pub enum RemoteError {
    /// The request never completed at the transport level (connection
    /// refused, DNS failure, socket reset).
    Network { message: String },
    /// The operation was aborted by a deadline.
    Timeout { message: String },
    /// The remote answered with a non-success HTTP status. `code` carries
    /// the provider error code from the response body when one was present.
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// A structured provider error that arrived without an HTTP status.
    Provider { code: String, message: String },
    /// Anything else. Classification falls back to message matching.
    Other { message: String },
}

impl RemoteError {
    pub fn message(&self) -> &str {
        match self {
            RemoteError::Network { message }
            | RemoteError::Timeout { message }
            | RemoteError::Http { message, .. }
            | RemoteError::Provider { message, .. }
            | RemoteError::Other { message } => message,
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Network { message } => write!(f, "network error: {message}"),
            RemoteError::Timeout { message } => write!(f, "timeout: {message}"),
            RemoteError::Http {
                status,
                code,
                message,
            } => match code {
                Some(code) => write!(f, "http {status} ({code}): {message}"),
                None => write!(f, "http {status}: {message}"),
            },
            RemoteError::Provider { code, message } => write!(f, "provider {code}: {message}"),
            RemoteError::Other { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// A persistence-layer failure. These are logged and contained: the engine
/// treats them as "no queue change occurred" rather than crashing.
#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Serialization(serde_json::Error),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "database error: {err}"),
            StoreError::Serialization(err) => write!(f, "serialization error: {err}"),
            StoreError::Backend(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}
