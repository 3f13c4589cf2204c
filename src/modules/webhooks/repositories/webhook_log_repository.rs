use async_trait::async_trait;
use sqlx::{MySql, Pool};

use crate::core::error::AppResult;
use crate::modules::webhooks::models::{WebhookLog, WebhookOutcome};

/// Repository for `WebhookLog`. `webhook_id` carries a unique constraint
/// at the database level — `find_by_webhook_id` is the duplicate-delivery
/// check the intake service runs before doing anything else (§4.1 step 3).
#[async_trait]
pub trait WebhookLogRepository: Send + Sync {
    async fn find_by_webhook_id(&self, webhook_id: &str) -> AppResult<Option<WebhookLog>>;

    async fn insert(&self, log: &WebhookLog) -> AppResult<WebhookLog>;

    async fn mark_outcome(
        &self,
        id: i64,
        outcome: WebhookOutcome,
        error_message: Option<&str>,
        order_id: Option<i64>,
        transaction_id: Option<i64>,
    ) -> AppResult<()>;

    async fn increment_processing_attempts(&self, id: i64) -> AppResult<()>;
}

pub struct MySqlWebhookLogRepository {
    pool: Pool<MySql>,
}

impl MySqlWebhookLogRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookLogRepository for MySqlWebhookLogRepository {
    async fn find_by_webhook_id(&self, webhook_id: &str) -> AppResult<Option<WebhookLog>> {
        let log = sqlx::query_as::<_, WebhookLog>(
            r#"
            SELECT id, webhook_id, provider, event_type, raw_payload, signature,
                   signature_valid, processed, processed_at, outcome, error_message,
                   processing_attempts, order_id, transaction_id, expires_at, created_at
            FROM webhook_logs
            WHERE webhook_id = ?
            "#,
        )
        .bind(webhook_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn insert(&self, log: &WebhookLog) -> AppResult<WebhookLog> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_logs (
                webhook_id, provider, event_type, raw_payload, signature,
                signature_valid, processed, processed_at, outcome, error_message,
                processing_attempts, order_id, transaction_id, expires_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.webhook_id)
        .bind(&log.provider)
        .bind(&log.event_type)
        .bind(&log.raw_payload)
        .bind(&log.signature)
        .bind(log.signature_valid)
        .bind(log.processed)
        .bind(log.processed_at)
        .bind(log.outcome)
        .bind(&log.error_message)
        .bind(log.processing_attempts)
        .bind(log.order_id)
        .bind(log.transaction_id)
        .bind(log.expires_at)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i64;
        self.find_by_id(id).await?.ok_or_else(|| {
            crate::core::error::AppError::internal("webhook log vanished after insert")
        })
    }

    async fn mark_outcome(
        &self,
        id: i64,
        outcome: WebhookOutcome,
        error_message: Option<&str>,
        order_id: Option<i64>,
        transaction_id: Option<i64>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_logs
            SET processed = TRUE, processed_at = UTC_TIMESTAMP(), outcome = ?,
                error_message = ?, order_id = ?, transaction_id = ?
            WHERE id = ?
            "#,
        )
        .bind(outcome)
        .bind(error_message)
        .bind(order_id)
        .bind(transaction_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_processing_attempts(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_logs
            SET processing_attempts = processing_attempts + 1
            WHERE id = ?
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl MySqlWebhookLogRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<WebhookLog>> {
        let log = sqlx::query_as::<_, WebhookLog>(
            r#"
            SELECT id, webhook_id, provider, event_type, raw_payload, signature,
                   signature_valid, processed, processed_at, outcome, error_message,
                   processing_attempts, order_id, transaction_id, expires_at, created_at
            FROM webhook_logs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }
}
