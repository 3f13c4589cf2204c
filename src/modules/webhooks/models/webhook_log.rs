use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome recorded once intake finishes classifying a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Success,
    ValidationFailed,
    ProcessingFailed,
    Duplicate,
    Ignored,
}

/// Append-only audit row and the primary idempotency gate: the unique
/// index on `webhook_id` turns a provider's retried delivery into a
/// `Duplicate` lookup instead of a second commit attempt. TTL'd at 3
/// days per §3's lifecycle note; pruning is left to a housekeeping task,
/// not modeled here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookLog {
    pub id: i64,
    pub webhook_id: String,
    pub provider: String,
    pub event_type: String,
    pub raw_payload: serde_json::Value,
    pub signature: Option<String>,
    pub signature_valid: bool,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub outcome: Option<WebhookOutcome>,
    pub error_message: Option<String>,
    pub processing_attempts: i32,
    pub order_id: Option<i64>,
    pub transaction_id: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl WebhookLog {
    pub const TTL_DAYS: i64 = 3;

    pub fn new(
        webhook_id: impl Into<String>,
        provider: impl Into<String>,
        event_type: impl Into<String>,
        raw_payload: serde_json::Value,
        signature: Option<String>,
        signature_valid: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            webhook_id: webhook_id.into(),
            provider: provider.into(),
            event_type: event_type.into(),
            raw_payload,
            signature,
            signature_valid,
            processed: false,
            processed_at: None,
            outcome: None,
            error_message: None,
            processing_attempts: 0,
            order_id: None,
            transaction_id: None,
            expires_at: now + chrono::Duration::days(Self::TTL_DAYS),
            created_at: now,
        }
    }
}
