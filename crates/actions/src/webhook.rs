//! Webhook executor.
//!
//! [`WebhookAction`] POSTs a JSON envelope wrapping the event payload to the
//! relay's `webhook_url`. The body is Discord compatible:
//!
//! ```json
//! {"content": "Relay triggered\n```json\n<payload>\n```"}
//! ```
//!
//! There is no in-process retry: a failed delivery fails the work item and
//! the broker redelivers it.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::action::required_str;
use relay_core::{ActionConfig, ActionError, ActionExecutor};
use tokio_util::sync::CancellationToken;

/// Config key holding the destination URL.
pub const WEBHOOK_URL_KEY: &str = "webhook_url";

/// HTTP request timeout for a single delivery attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Delivers relay payloads to external webhook endpoints.
#[derive(Debug, Clone)]
pub struct WebhookAction {
    client: reqwest::Client,
}

impl WebhookAction {
    /// Create an executor with a pre-configured HTTP client.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Build the request body for a payload.
    pub fn body(payload: &[u8]) -> serde_json::Value {
        serde_json::json!({
            "content": format!(
                "Relay triggered\n```json\n{}\n```",
                String::from_utf8_lossy(payload)
            ),
        })
    }

    /// Execute a single POST request and check the response status.
    async fn send(&self, url: reqwest::Url, body: &serde_json::Value) -> Result<(), ActionError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ActionError::Transport(Box::new(e)))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(ActionError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionExecutor for WebhookAction {
    async fn execute(
        &self,
        config: &ActionConfig,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        let raw_url = required_str(config, WEBHOOK_URL_KEY)?;
        let url = reqwest::Url::parse(raw_url)
            .map_err(|e| ActionError::InvalidConfig(format!("{WEBHOOK_URL_KEY} {raw_url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ActionError::InvalidConfig(format!(
                "{WEBHOOK_URL_KEY} must use http or https, got {}",
                url.scheme()
            )));
        }

        let body = Self::body(payload);
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(url = %raw_url, "Webhook delivery cancelled");
                Err(ActionError::Cancelled)
            }
            result = self.send(url, &body) => result,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
