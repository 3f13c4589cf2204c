use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::error::{AppError, AppResult};
use crate::modules::webhooks::models::{GenericEvent, WebhookEvent};

use super::WebhookProvider;

type HmacSha256 = Hmac<Sha256>;

/// Fallback for any provider name that doesn't have a dedicated
/// implementation. Per §6, unknown providers are still required to
/// present an `x-signature` over a shared secret — the canonical keys
/// (`transaction_id`, `order_id`, `status`, `amount`, `currency`) are
/// taken from the body as-is, with no provider-specific translation.
pub struct GenericProvider {
    secret: String,
}

impl GenericProvider {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    fn expected_signature(&self, raw_payload: &[u8]) -> AppResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::internal(format!("invalid generic provider secret: {e}")))?;
        mac.update(raw_payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl WebhookProvider for GenericProvider {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn verify_signature(&self, raw_payload: &[u8], signature: &str) -> bool {
        let Ok(expected) = self.expected_signature(raw_payload) else {
            return false;
        };
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        if provided.len() != expected.len() {
            return false;
        }
        bool::from(expected.as_slice().ct_eq(provided.as_slice()))
    }

    fn parse(&self, raw_payload: &[u8]) -> AppResult<WebhookEvent> {
        let event: GenericEvent = serde_json::from_slice(raw_payload)
            .map_err(|e| AppError::validation(format!("invalid generic payload: {e}")))?;
        Ok(WebhookEvent::Generic(event))
    }
}
