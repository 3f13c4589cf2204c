use crate::core::error::{AppError, AppResult};
use crate::modules::webhooks::models::{MockEvent, WebhookEvent};

use super::WebhookProvider;

/// Sandbox/test provider used by the integration test harness. Signature
/// verification is bypassed for this provider, but only when the caller's
/// config explicitly allows it — `allows_unsigned` is advisory, the
/// intake service still checks its own "mock enabled" flag before acting
/// on it, so a misconfigured production deploy fails closed.
pub struct MockProvider;

impl WebhookProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn verify_signature(&self, _raw_payload: &[u8], _signature: &str) -> bool {
        true
    }

    fn allows_unsigned(&self) -> bool {
        true
    }

    fn parse(&self, raw_payload: &[u8]) -> AppResult<WebhookEvent> {
        let event: MockEvent = serde_json::from_slice(raw_payload)
            .map_err(|e| AppError::validation(format!("invalid mock payload: {e}")))?;
        Ok(WebhookEvent::Mock(event))
    }
}
