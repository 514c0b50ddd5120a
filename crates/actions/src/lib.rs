//! Built-in relay action executors.
//!
//! - [`DebugLogAction`] (`debug_log`): writes the payload to the log.
//! - [`WebhookAction`] (`webhook`, `discord_send`): POSTs the payload to
//!   the relay's configured URL.

use std::sync::Arc;

use relay_core::ActionRegistry;

pub mod debug_log;
pub mod webhook;

pub use debug_log::DebugLogAction;
pub use webhook::WebhookAction;

/// Action type of [`DebugLogAction`].
pub const DEBUG_LOG: &str = "debug_log";

/// Action type of [`WebhookAction`].
pub const WEBHOOK: &str = "webhook";

/// Alias kept for relays configured against Discord incoming webhooks.
pub const DISCORD_SEND: &str = "discord_send";

/// Register every built-in executor on `registry`.
pub fn register_builtin(registry: &mut ActionRegistry) -> Result<(), reqwest::Error> {
    let webhook = Arc::new(WebhookAction::new()?);

    registry.register(DEBUG_LOG, Arc::new(DebugLogAction::new()));
    registry.register(WEBHOOK, webhook.clone());
    registry.register(DISCORD_SEND, webhook);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registration_covers_all_action_types() {
        let mut registry = ActionRegistry::new();
        register_builtin(&mut registry).unwrap();

        assert_eq!(registry.names(), vec![DEBUG_LOG, DISCORD_SEND, WEBHOOK]);
        assert!(registry.resolve("sms_send").is_err());
    }
}
