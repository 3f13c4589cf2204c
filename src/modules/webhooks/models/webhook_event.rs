use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical shape every provider payload normalizes into before it
/// reaches the payment-commit step. `status` is deliberately not the
/// provider's own vocabulary — each provider's `WebhookProvider::parse`
/// maps its event type onto one of these two outcomes (or rejects the
/// event as unrecognized before it gets this far).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NormalizedStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPayment {
    pub transaction_id: String,
    pub order_id: i64,
    pub status: NormalizedStatus,
    pub amount: Decimal,
    pub currency: String,
}

/// Raw provider payloads modeled as a sum type, per the spec's redesign
/// note, rather than a single loosely-typed JSON blob threaded through
/// every call site. Each variant is the provider's native shape; the
/// `normalize` method is the only place provider vocabulary leaks out
/// of the `webhooks` module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum WebhookEvent {
    Paystack(PaystackEvent),
    Mock(MockEvent),
    Generic(GenericEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaystackEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackEventData {
    pub object: PaystackObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackObject {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub metadata: PaystackMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaystackMetadata {
    pub order_id: i64,
}

/// The test/sandbox provider: signature verification is bypassed for
/// this provider only, and only when explicitly enabled in config
/// (§4.1 step 1) — never in production.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockEvent {
    pub event_type: String,
    pub transaction_id: String,
    pub order_id: i64,
    pub amount: Decimal,
    pub currency: String,
}

/// Identity-mapped fallback for providers with no dedicated parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericEvent {
    pub transaction_id: String,
    pub order_id: i64,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
}

impl WebhookEvent {
    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::Paystack(e) => &e.event_type,
            WebhookEvent::Mock(e) => &e.event_type,
            WebhookEvent::Generic(e) => &e.status,
        }
    }

    /// Normalizes any variant into the canonical `{transaction_id, order_id,
    /// status, amount, currency}` record the commit step consumes.
    pub fn normalize(&self) -> Option<NormalizedPayment> {
        match self {
            WebhookEvent::Paystack(e) => {
                let status = match e.event_type.as_str() {
                    "charge.success" => NormalizedStatus::Succeeded,
                    "charge.failed" => NormalizedStatus::Failed,
                    _ => return None,
                };
                Some(NormalizedPayment {
                    transaction_id: e.data.object.id.clone(),
                    order_id: e.data.object.metadata.order_id,
                    status,
                    amount: e.data.object.amount,
                    currency: e.data.object.currency.clone(),
                })
            }
            WebhookEvent::Mock(e) => {
                let status = match e.event_type.as_str() {
                    "succeeded" => NormalizedStatus::Succeeded,
                    "failed" => NormalizedStatus::Failed,
                    _ => return None,
                };
                Some(NormalizedPayment {
                    transaction_id: e.transaction_id.clone(),
                    order_id: e.order_id,
                    status,
                    amount: e.amount,
                    currency: e.currency.clone(),
                })
            }
            WebhookEvent::Generic(e) => {
                let status = match e.status.as_str() {
                    "succeeded" => NormalizedStatus::Succeeded,
                    "failed" => NormalizedStatus::Failed,
                    _ => return None,
                };
                Some(NormalizedPayment {
                    transaction_id: e.transaction_id.clone(),
                    order_id: e.order_id,
                    status,
                    amount: e.amount,
                    currency: e.currency.clone(),
                })
            }
        }
    }
}
