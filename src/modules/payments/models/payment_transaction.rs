use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A payment transaction is write-once: it is inserted exactly once per
/// `transaction_id` (the provider's payment identifier) and never
/// updated afterward. The `transaction_id` unique constraint is what
/// lets a second committer racing on the same payment treat its own
/// insert attempt as `already_processed` instead of double-committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentTransaction {
    pub id: i64,
    pub transaction_id: String,
    pub order_id: i64,
    pub user_id: i64,
    pub store_id: i64,
    pub provider: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub webhook_log_id: i64,
    pub succeeded_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentTransaction {
    pub fn succeeded(
        transaction_id: impl Into<String>,
        order_id: i64,
        user_id: i64,
        store_id: i64,
        provider: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        webhook_log_id: i64,
    ) -> Self {
        Self {
            id: 0,
            transaction_id: transaction_id.into(),
            order_id,
            user_id,
            store_id,
            provider: provider.into(),
            amount,
            currency: currency.into(),
            status: TransactionStatus::Succeeded,
            webhook_log_id,
            succeeded_at: Some(Utc::now()),
            failed_at: None,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn failed(
        transaction_id: impl Into<String>,
        order_id: i64,
        user_id: i64,
        store_id: i64,
        provider: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        webhook_log_id: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            transaction_id: transaction_id.into(),
            order_id,
            user_id,
            store_id,
            provider: provider.into(),
            amount,
            currency: currency.into(),
            status: TransactionStatus::Failed,
            webhook_log_id,
            succeeded_at: None,
            failed_at: Some(Utc::now()),
            failure_reason: Some(reason.into()),
            created_at: Utc::now(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == TransactionStatus::Succeeded
    }
}
