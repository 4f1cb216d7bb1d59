//! HTTP client for the load-submission API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ClientError;

/// Per-request timeout, matching the remote API's practical latency.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response-body slice kept in outcomes and errors.
const SNIPPET_MAX: usize = 200;

/// Result of one delivered HTTP call: the status plus a body snippet for
/// diagnostics. Delivery alone is not success; the pipeline classifies
/// the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body_snippet: String,
}

/// The request never produced an HTTP response: connect failure, reset,
/// or timeout. Always classified transient.
#[derive(Debug, Clone, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

/// Seam between the pipeline and the wire.
///
/// The production implementation is [`ApiClient`]; tests substitute a
/// scripted fake so retry and cancellation behavior is deterministic.
#[async_trait]
pub trait LoadSubmitter: Send + Sync {
    /// Sends one load payload, returning the delivered response or a
    /// transport failure.
    async fn submit_load(&self, payload: &Value) -> Result<SubmitResponse, TransportError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenRefreshResponse {
    access_token: Option<String>,
}

/// Bearer-authenticated client for the load-submission API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer: String,
}

impl ApiClient {
    /// Exchanges the stored API token for a bearer token and returns a
    /// ready client. A failed exchange means bad credentials or an
    /// unreachable API, so this doubles as connection validation.
    pub async fn connect(base_url: &str, api_token: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        debug!(base_url = base_url.as_str(), "refreshing API token");
        let response = http
            .post(format!("{base_url}/token/refresh"))
            .json(&json!({ "refreshToken": api_token }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let snippet = snippet(&response.text().await.unwrap_or_default());
            return Err(ClientError::TokenRefreshRejected {
                status: status.as_u16(),
                snippet,
            });
        }
        let token: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let bearer = token.access_token.ok_or(ClientError::MissingAccessToken)?;

        info!(base_url = base_url.as_str(), "API client connected");
        Ok(Self {
            http,
            base_url,
            bearer,
        })
    }

    /// Validates a credential without keeping the client.
    pub async fn validate(base_url: &str, api_token: &str) -> Result<(), ClientError> {
        Self::connect(base_url, api_token).await.map(|_| ())
    }
}

#[async_trait]
impl LoadSubmitter for ApiClient {
    async fn submit_load(&self, payload: &Value) -> Result<SubmitResponse, TransportError> {
        let response = self
            .http
            .post(format!("{}/v2/loads", self.base_url))
            .bearer_auth(&self.bearer)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError {
                timed_out: e.is_timeout(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NO_CONTENT {
            return Ok(SubmitResponse {
                status: status.as_u16(),
                body_snippet: String::new(),
            });
        }
        Ok(SubmitResponse {
            status: status.as_u16(),
            body_snippet: snippet(&body),
        })
    }
}

/// Truncates a response body for diagnostics, on a char boundary.
pub(crate) fn snippet(body: &str) -> String {
    if body.chars().count() <= SNIPPET_MAX {
        return body.to_string();
    }
    body.chars().take(SNIPPET_MAX).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), SNIPPET_MAX);
        assert_eq!(snippet("short"), "short");
    }
}
