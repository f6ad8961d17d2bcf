use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::ErrorKind;

/// Current on-disk layout version for the persisted queue.
pub const QUEUE_VERSION: u32 = 1;

/// The kind of remote mutation an action performs. Determines which
/// registered executor handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Subscribe,
    Unsubscribe,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Subscribe => "SUBSCRIBE",
            ActionType::Unsubscribe => "UNSUBSCRIBE",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queued mutation intent awaiting remote execution.
///
/// `id` is a UUIDv7 assigned at enqueue time; its lexicographic order is
/// creation order, so the queue never needs a separate position column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub action_type: ActionType,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub auth_retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_kind: Option<ErrorKind>,
}

impl Action {
    pub fn new(action_type: ActionType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            action_type,
            payload,
            created_at: Utc::now(),
            retry_count: 0,
            auth_retry_count: 0,
            last_error: None,
            last_error_kind: None,
        }
    }

    /// Stamp the diagnostic snapshot of the most recent failure.
    /// Informational only; control flow runs off the retry counters.
    pub fn record_failure(&mut self, message: String, kind: ErrorKind) {
        self.last_error = Some(message);
        self.last_error_kind = Some(kind);
    }
}

/// The single persisted record: a versioned envelope around the ordered
/// action list, stored as JSON under one well-known key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEnvelope {
    pub version: u32,
    pub actions: Vec<Action>,
}

impl QueueEnvelope {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            version: QUEUE_VERSION,
            actions,
        }
    }
}
