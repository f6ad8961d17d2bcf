use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Classification output driving the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Timeout,
    Auth,
    Conflict,
    Validation,
    Server,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Auth => "auth",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message fragments that indicate a transport-level connectivity failure.
/// Matched case-insensitively against errors that carry no structure.
const NETWORK_PHRASES: &[&str] = &[
    "network request failed",
    "network error",
    "fetch failed",
    "connection refused",
    "connection reset",
    "connection closed",
    "dns",
    "socket hang up",
    "unreachable",
    "offline",
];

const TIMEOUT_PHRASES: &[&str] = &["timeout", "timed out", "deadline", "aborted"];

/// Map a remote failure to exactly one [`ErrorKind`].
///
/// Total and side-effect free. Priority: network > timeout > auth >
/// conflict > validation > server > unknown; the first matching rule wins.
/// Also used on its own for synchronous UI error messages, so it assumes
/// nothing about queue state.
pub fn classify(error: &RemoteError) -> ErrorKind {
    match error {
        RemoteError::Network { .. } => ErrorKind::Network,
        RemoteError::Timeout { .. } => ErrorKind::Timeout,
        RemoteError::Http { status, code, .. } => classify_status(*status, code.as_deref()),
        RemoteError::Provider { code, message } => match code.as_str() {
            "UNAUTHORIZED" => ErrorKind::Auth,
            "CONFLICT" => ErrorKind::Conflict,
            _ => classify_message(message),
        },
        RemoteError::Other { message } => classify_message(message),
    }
}

fn classify_status(status: u16, code: Option<&str>) -> ErrorKind {
    if status == 401 || code == Some("UNAUTHORIZED") {
        return ErrorKind::Auth;
    }
    if status == 409 || code == Some("CONFLICT") {
        return ErrorKind::Conflict;
    }
    if (400..500).contains(&status) {
        return ErrorKind::Validation;
    }
    if status >= 500 {
        return ErrorKind::Server;
    }
    ErrorKind::Unknown
}

fn classify_message(message: &str) -> ErrorKind {
    let message = message.to_lowercase();
    if NETWORK_PHRASES.iter().any(|p| message.contains(p)) {
        return ErrorKind::Network;
    }
    if TIMEOUT_PHRASES.iter().any(|p| message.contains(p)) {
        return ErrorKind::Timeout;
    }
    ErrorKind::Unknown
}
