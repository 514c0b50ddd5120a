//! Diagnostic executor that echoes the payload into the log.

use async_trait::async_trait;
use relay_core::{ActionConfig, ActionError, ActionExecutor};
use tokio_util::sync::CancellationToken;

/// Prefix used when the relay config does not set `prefix`.
const DEFAULT_PREFIX: &str = "DEBUG_LOG";

/// Logs every payload at `info` level. Never fails.
#[derive(Debug, Default)]
pub struct DebugLogAction;

impl DebugLogAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionExecutor for DebugLogAction {
    async fn execute(
        &self,
        config: &ActionConfig,
        payload: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        let prefix = config
            .get("prefix")
            .and_then(serde_json::Value::as_str)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PREFIX);

        tracing::info!(
            prefix,
            payload = %String::from_utf8_lossy(payload),
            "Payload received"
        );
        Ok(())
    }
}
