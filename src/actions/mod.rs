pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::action::ActionType;

/// Remote write capability for one action type.
///
/// Implementations normalize whatever their transport raises into
/// [`RemoteError`] so the processor can classify failures on a closed type.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, payload: &serde_json::Value) -> Result<serde_json::Value, RemoteError>;
}

/// Credential refresh capability, invoked at most once per auth-failed
/// action per pass. Deployments without a refresh flow register
/// [`UnimplementedRefresher`], which makes auth failures effectively
/// permanent after the first attempt.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self) -> Result<(), RemoteError>;
}

pub struct UnimplementedRefresher;

#[async_trait]
impl CredentialRefresher for UnimplementedRefresher {
    async fn refresh(&self) -> Result<(), RemoteError> {
        Err(RemoteError::Other {
            message: "credential refresh is not implemented".to_string(),
        })
    }
}

/// Dispatch table mapping each action type to its executor.
pub struct ExecutorRegistry {
    executors: HashMap<ActionType, Arc<dyn ActionExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register(&mut self, action_type: ActionType, executor: Arc<dyn ActionExecutor>) {
        self.executors.insert(action_type, executor);
    }

    pub fn get(&self, action_type: ActionType) -> Option<&Arc<dyn ActionExecutor>> {
        self.executors.get(&action_type)
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
