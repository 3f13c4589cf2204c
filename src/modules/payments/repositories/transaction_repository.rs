use async_trait::async_trait;
use sqlx::{MySql, Pool, Transaction};

use crate::core::error::AppResult;
use crate::modules::payments::models::PaymentTransaction;

/// Repository for `PaymentTransaction`. The unique `transaction_id`
/// constraint is the dedup gate for the whole pipeline: a second insert
/// attempt for the same provider payment returns the already-committed
/// row instead of a duplicate, the way the teacher's transaction
/// repository gates on its own idempotency key.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: &PaymentTransaction) -> AppResult<PaymentTransaction>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<PaymentTransaction>>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> AppResult<Option<PaymentTransaction>>;

    /// Inserts the transaction row inside the caller's commit transaction.
    /// Unlike `create`, this does not pre-check for an existing row — the
    /// unique index on `transaction_id` is the gate, and the caller
    /// interprets a unique-violation error as "a concurrent committer won".
    async fn create_in_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        transaction: &PaymentTransaction,
    ) -> AppResult<PaymentTransaction>;
}

pub struct MySqlTransactionRepository {
    pool: Pool<MySql>,
}

impl MySqlTransactionRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for MySqlTransactionRepository {
    async fn create(&self, transaction: &PaymentTransaction) -> AppResult<PaymentTransaction> {
        if let Some(existing) = self
            .find_by_transaction_id(&transaction.transaction_id)
            .await?
        {
            return Ok(existing);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                transaction_id, order_id, user_id, store_id, provider, amount,
                currency, status, webhook_log_id, succeeded_at, failed_at,
                failure_reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.transaction_id)
        .bind(transaction.order_id)
        .bind(transaction.user_id)
        .bind(transaction.store_id)
        .bind(&transaction.provider)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.status)
        .bind(transaction.webhook_log_id)
        .bind(transaction.succeeded_at)
        .bind(transaction.failed_at)
        .bind(&transaction.failure_reason)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i64;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| crate::core::error::AppError::internal("transaction vanished after insert"))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<PaymentTransaction>> {
        let tx = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            SELECT id, transaction_id, order_id, user_id, store_id, provider,
                   amount, currency, status, webhook_log_id, succeeded_at,
                   failed_at, failure_reason, created_at
            FROM payment_transactions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tx)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> AppResult<Option<PaymentTransaction>> {
        let tx = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            SELECT id, transaction_id, order_id, user_id, store_id, provider,
                   amount, currency, status, webhook_log_id, succeeded_at,
                   failed_at, failure_reason, created_at
            FROM payment_transactions
            WHERE transaction_id = ?
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tx)
    }

    async fn create_in_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        transaction: &PaymentTransaction,
    ) -> AppResult<PaymentTransaction> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                transaction_id, order_id, user_id, store_id, provider, amount,
                currency, status, webhook_log_id, succeeded_at, failed_at,
                failure_reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.transaction_id)
        .bind(transaction.order_id)
        .bind(transaction.user_id)
        .bind(transaction.store_id)
        .bind(&transaction.provider)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.status)
        .bind(transaction.webhook_log_id)
        .bind(transaction.succeeded_at)
        .bind(transaction.failed_at)
        .bind(&transaction.failure_reason)
        .bind(transaction.created_at)
        .execute(&mut **tx)
        .await?;

        let id = result.last_insert_id() as i64;

        let inserted = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            SELECT id, transaction_id, order_id, user_id, store_id, provider,
                   amount, currency, status, webhook_log_id, succeeded_at,
                   failed_at, failure_reason, created_at
            FROM payment_transactions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| crate::core::error::AppError::internal("transaction vanished after insert"))?;

        Ok(inserted)
    }
}
