pub mod generic;
pub mod mock;
pub mod paystack;

use crate::core::error::AppResult;
use crate::modules::webhooks::models::WebhookEvent;

/// One implementation per upstream payment provider. Generalizes the
/// teacher's `PaymentGateway` trait (outbound payment creation +
/// webhook verification) down to the inbound half only: verify the
/// delivery's signature, then parse its body into a `WebhookEvent`.
pub trait WebhookProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// §4.1 step 1–2: `mock` bypasses this when explicitly enabled;
    /// every other provider must supply a signature header and this
    /// must run in constant time over the digest bytes.
    fn verify_signature(&self, raw_payload: &[u8], signature: &str) -> bool;

    fn parse(&self, raw_payload: &[u8]) -> AppResult<WebhookEvent>;

    /// Whether this provider allows signature verification to be
    /// skipped. Only `mock` returns true, and only the caller's config
    /// (never the provider itself) decides whether to act on it.
    fn allows_unsigned(&self) -> bool {
        false
    }
}

pub use generic::GenericProvider;
pub use mock::MockProvider;
pub use paystack::PaystackProvider;
