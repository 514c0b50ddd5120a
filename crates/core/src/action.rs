//! Pluggable action executor capability.
//!
//! Every action type (local logging, webhook notification, ...) implements
//! [`ActionExecutor`] and is registered under a name in the
//! [`ActionRegistry`](crate::registry::ActionRegistry). Adding an action type
//! never requires touching the worker pool or the queue bridge.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Untyped key/value configuration stored with each relay action.
pub type ActionConfig = serde_json::Map<String, serde_json::Value>;

/// Errors reported by an action executor.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// A required configuration key is absent or empty.
    #[error("Missing {0} in relay config")]
    MissingConfig(&'static str),

    /// A configuration key is present but unusable.
    #[error("Invalid relay config: {0}")]
    InvalidConfig(String),

    /// The outbound call failed before a response was received.
    #[error("Request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote endpoint answered with a rejecting status code.
    #[error("Remote endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// The process-wide cancellation token fired mid-execution.
    #[error("Execution cancelled")]
    Cancelled,
}

/// Capability implemented once per action type.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute the action for one event.
    ///
    /// `config` is the relay's stored configuration, `payload` the raw event
    /// bytes. Long-running work must observe `cancel`.
    async fn execute(
        &self,
        config: &ActionConfig,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), ActionError>;
}

/// Read a required, non-empty string key from an action config.
pub fn required_str<'a>(config: &'a ActionConfig, key: &'static str) -> Result<&'a str, ActionError> {
    match config.get(key) {
        None | Some(serde_json::Value::Null) => Err(ActionError::MissingConfig(key)),
        Some(serde_json::Value::String(s)) if s.is_empty() => Err(ActionError::MissingConfig(key)),
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(other) => Err(ActionError::InvalidConfig(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}
