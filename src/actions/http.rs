use async_trait::async_trait;
use serde_json::json;

use super::{ActionExecutor, CredentialRefresher};
use crate::error::RemoteError;

/// Executes mutations by POSTing the action payload to a fixed endpoint.
///
/// This is the network boundary: request failures and non-2xx responses
/// are normalized into [`RemoteError`] here so nothing downstream has to
/// inspect transport-specific error shapes.
pub struct HttpExecutor {
    client: reqwest::Client,
    url: String,
    headers: Vec<(String, String)>,
}

impl HttpExecutor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build reqwest client"),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[async_trait]
impl ActionExecutor for HttpExecutor {
    async fn execute(&self, payload: &serde_json::Value) -> Result<serde_json::Value, RemoteError> {
        let mut req = self.client.post(&self.url).json(payload);
        for (name, value) in &self.headers {
            req = req.header(name, value);
        }

        let resp = req.send().await.map_err(normalize_request_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            return Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null));
        }

        Err(normalize_response(status, &body))
    }
}

/// Refreshes credentials by POSTing to a token endpoint.
pub struct HttpRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpRefresher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build reqwest client"),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CredentialRefresher for HttpRefresher {
    async fn refresh(&self) -> Result<(), RemoteError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({}))
            .send()
            .await
            .map_err(normalize_request_error)?;

        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(normalize_response(status, &body))
    }
}

fn normalize_request_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_connect() {
        RemoteError::Network {
            message: err.to_string(),
        }
    } else {
        RemoteError::Other {
            message: err.to_string(),
        }
    }
}

fn normalize_response(status: u16, body: &str) -> RemoteError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| body.chars().take(1024).collect());

    RemoteError::Http {
        status,
        code,
        message,
    }
}
