use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool, Transaction};

use crate::core::error::AppResult;
use crate::modules::receipts::models::{Receipt, ReceiptStatus};

const COLUMNS: &str = r#"
    id, receipt_number, order_id, transaction_id, user_id, store_id,
    order_snapshot, amount, currency, status, paid_at,
    pdf_generated, pdf_generated_at, pdf_local_path, pdf_size_bytes, pdf_generation_attempts,
    cloudinary_uploaded, cloudinary_uploaded_at, cloudinary_public_id, cloudinary_secure_url,
    cloudinary_signed_url, cloudinary_signed_url_expires_at, cloudinary_upload_attempts,
    email_sent, email_sent_at, email_send_attempts, email_permanent_failure, email_last_error,
    email_recipient, created_at, updated_at
"#;

/// Repository for `Receipt`. `transaction_id` carries a unique constraint
/// — it is the idempotency gate the payment-commit step relies on — and
/// every fulfillment worker reads/writes only the column group it owns
/// via the narrow `update_*` methods below, never a generic `update`.
#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Receipt>>;

    async fn find_by_transaction_id(&self, transaction_id: i64) -> AppResult<Option<Receipt>>;

    /// Counts receipts already issued for `(store_id, year)`, used to seed
    /// the next `RCP-YYYY-NNNNNN` sequence number.
    async fn count_for_store_and_year(&self, store_id: i64, year: i32) -> AppResult<i64>;

    async fn insert(&self, receipt: &Receipt) -> AppResult<Receipt>;

    /// Same count as `count_for_store_and_year`, scoped to the caller's
    /// commit transaction so the sequence number is read against the
    /// same snapshot the insert below writes into.
    async fn count_for_store_and_year_in_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        store_id: i64,
        year: i32,
    ) -> AppResult<i64>;

    /// Same insert as `insert`, scoped to the caller's commit transaction.
    async fn insert_in_tx(&self, tx: &mut Transaction<'_, MySql>, receipt: &Receipt) -> AppResult<Receipt>;

    async fn update_pdf_stage(
        &self,
        id: i64,
        local_path: &str,
        size_bytes: i64,
        attempts: i32,
    ) -> AppResult<()>;

    async fn record_pdf_attempt(&self, id: i64, attempts: i32) -> AppResult<()>;

    async fn update_cloudinary_stage(
        &self,
        id: i64,
        public_id: &str,
        secure_url: &str,
        signed_url: &str,
        signed_url_expires_at: DateTime<Utc>,
        attempts: i32,
    ) -> AppResult<()>;

    async fn record_cloudinary_attempt(&self, id: i64, attempts: i32) -> AppResult<()>;

    async fn update_email_stage(&self, id: i64, attempts: i32) -> AppResult<()>;

    async fn record_email_failure(
        &self,
        id: i64,
        attempts: i32,
        permanent: bool,
        last_error: &str,
    ) -> AppResult<()>;

    async fn mark_completed(&self, id: i64) -> AppResult<()>;

    /// Candidates for the recovery sweep: receipts stuck on a given
    /// stage, older than `older_than`, up to `limit` rows.
    async fn find_stuck_on_pdf(&self, older_than: DateTime<Utc>, limit: i64) -> AppResult<Vec<Receipt>>;

    async fn find_stuck_on_cloudinary(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Receipt>>;

    async fn find_stuck_on_email(&self, older_than: DateTime<Utc>, limit: i64) -> AppResult<Vec<Receipt>>;
}

pub struct MySqlReceiptRepository {
    pool: Pool<MySql>,
}

impl MySqlReceiptRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn fetch_one(&self, id: i64) -> AppResult<Option<Receipt>> {
        let query = format!("SELECT {COLUMNS} FROM receipts WHERE id = ?");
        let receipt = sqlx::query_as::<_, Receipt>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(receipt)
    }
}

#[async_trait]
impl ReceiptRepository for MySqlReceiptRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Receipt>> {
        self.fetch_one(id).await
    }

    async fn find_by_transaction_id(&self, transaction_id: i64) -> AppResult<Option<Receipt>> {
        let query = format!("SELECT {COLUMNS} FROM receipts WHERE transaction_id = ?");
        let receipt = sqlx::query_as::<_, Receipt>(&query)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(receipt)
    }

    async fn count_for_store_and_year(&self, store_id: i64, year: i32) -> AppResult<i64> {
        let prefix = format!("RCP-{:04}-%", year);
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM receipts WHERE store_id = ? AND receipt_number LIKE ?",
        )
        .bind(store_id)
        .bind(prefix)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert(&self, receipt: &Receipt) -> AppResult<Receipt> {
        let result = sqlx::query(
            r#"
            INSERT INTO receipts (
                receipt_number, order_id, transaction_id, user_id, store_id,
                order_snapshot, amount, currency, status, paid_at,
                pdf_generated, pdf_generation_attempts,
                cloudinary_uploaded, cloudinary_upload_attempts,
                email_sent, email_send_attempts, email_permanent_failure, email_recipient,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&receipt.receipt_number)
        .bind(receipt.order_id)
        .bind(receipt.transaction_id)
        .bind(receipt.user_id)
        .bind(receipt.store_id)
        .bind(&receipt.order_snapshot)
        .bind(receipt.amount)
        .bind(&receipt.currency)
        .bind(receipt.status)
        .bind(receipt.paid_at)
        .bind(false)
        .bind(0i32)
        .bind(false)
        .bind(0i32)
        .bind(false)
        .bind(0i32)
        .bind(false)
        .bind(&receipt.email_recipient)
        .bind(receipt.created_at)
        .bind(receipt.updated_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i64;
        self.fetch_one(id)
            .await?
            .ok_or_else(|| crate::core::error::AppError::internal("receipt vanished after insert"))
    }

    async fn count_for_store_and_year_in_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        store_id: i64,
        year: i32,
    ) -> AppResult<i64> {
        let prefix = format!("RCP-{:04}-%", year);
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM receipts WHERE store_id = ? AND receipt_number LIKE ?",
        )
        .bind(store_id)
        .bind(prefix)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    async fn insert_in_tx(&self, tx: &mut Transaction<'_, MySql>, receipt: &Receipt) -> AppResult<Receipt> {
        let result = sqlx::query(
            r#"
            INSERT INTO receipts (
                receipt_number, order_id, transaction_id, user_id, store_id,
                order_snapshot, amount, currency, status, paid_at,
                pdf_generated, pdf_generation_attempts,
                cloudinary_uploaded, cloudinary_upload_attempts,
                email_sent, email_send_attempts, email_permanent_failure, email_recipient,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&receipt.receipt_number)
        .bind(receipt.order_id)
        .bind(receipt.transaction_id)
        .bind(receipt.user_id)
        .bind(receipt.store_id)
        .bind(&receipt.order_snapshot)
        .bind(receipt.amount)
        .bind(&receipt.currency)
        .bind(receipt.status)
        .bind(receipt.paid_at)
        .bind(false)
        .bind(0i32)
        .bind(false)
        .bind(0i32)
        .bind(false)
        .bind(0i32)
        .bind(false)
        .bind(&receipt.email_recipient)
        .bind(receipt.created_at)
        .bind(receipt.updated_at)
        .execute(&mut **tx)
        .await?;

        let id = result.last_insert_id() as i64;
        let query = format!("SELECT {COLUMNS} FROM receipts WHERE id = ?");
        let inserted = sqlx::query_as::<_, Receipt>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| crate::core::error::AppError::internal("receipt vanished after insert"))?;
        Ok(inserted)
    }

    async fn update_pdf_stage(
        &self,
        id: i64,
        local_path: &str,
        size_bytes: i64,
        attempts: i32,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE receipts
            SET pdf_generated = TRUE, pdf_generated_at = UTC_TIMESTAMP(),
                pdf_local_path = ?, pdf_size_bytes = ?, pdf_generation_attempts = ?,
                updated_at = UTC_TIMESTAMP()
            WHERE id = ?
            "#,
        )
        .bind(local_path)
        .bind(size_bytes)
        .bind(attempts)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_pdf_attempt(&self, id: i64, attempts: i32) -> AppResult<()> {
        sqlx::query("UPDATE receipts SET pdf_generation_attempts = ?, updated_at = UTC_TIMESTAMP() WHERE id = ?")
            .bind(attempts)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_cloudinary_stage(
        &self,
        id: i64,
        public_id: &str,
        secure_url: &str,
        signed_url: &str,
        signed_url_expires_at: DateTime<Utc>,
        attempts: i32,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE receipts
            SET cloudinary_uploaded = TRUE, cloudinary_uploaded_at = UTC_TIMESTAMP(),
                cloudinary_public_id = ?, cloudinary_secure_url = ?, cloudinary_signed_url = ?,
                cloudinary_signed_url_expires_at = ?, cloudinary_upload_attempts = ?,
                updated_at = UTC_TIMESTAMP()
            WHERE id = ?
            "#,
        )
        .bind(public_id)
        .bind(secure_url)
        .bind(signed_url)
        .bind(signed_url_expires_at)
        .bind(attempts)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_cloudinary_attempt(&self, id: i64, attempts: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE receipts SET cloudinary_upload_attempts = ?, updated_at = UTC_TIMESTAMP() WHERE id = ?",
        )
        .bind(attempts)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_email_stage(&self, id: i64, attempts: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE receipts
            SET email_sent = TRUE, email_sent_at = UTC_TIMESTAMP(), email_send_attempts = ?,
                updated_at = UTC_TIMESTAMP()
            WHERE id = ?
            "#,
        )
        .bind(attempts)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_email_failure(
        &self,
        id: i64,
        attempts: i32,
        permanent: bool,
        last_error: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE receipts
            SET email_send_attempts = ?, email_permanent_failure = ?, email_last_error = ?,
                updated_at = UTC_TIMESTAMP()
            WHERE id = ?
            "#,
        )
        .bind(attempts)
        .bind(permanent)
        .bind(last_error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_completed(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE receipts
            SET status = ?, updated_at = UTC_TIMESTAMP()
            WHERE id = ? AND status = ?
                AND pdf_generated = TRUE AND cloudinary_uploaded = TRUE AND email_sent = TRUE
            "#,
        )
        .bind(ReceiptStatus::Completed)
        .bind(id)
        .bind(ReceiptStatus::Pending)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_stuck_on_pdf(&self, older_than: DateTime<Utc>, limit: i64) -> AppResult<Vec<Receipt>> {
        let query = format!(
            "SELECT {COLUMNS} FROM receipts WHERE pdf_generated = FALSE AND created_at < ? ORDER BY created_at ASC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, Receipt>(&query)
            .bind(older_than)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_stuck_on_cloudinary(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Receipt>> {
        let query = format!(
            "SELECT {COLUMNS} FROM receipts WHERE pdf_generated = TRUE AND cloudinary_uploaded = FALSE AND created_at < ? ORDER BY created_at ASC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, Receipt>(&query)
            .bind(older_than)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_stuck_on_email(&self, older_than: DateTime<Utc>, limit: i64) -> AppResult<Vec<Receipt>> {
        let query = format!(
            "SELECT {COLUMNS} FROM receipts WHERE email_sent = FALSE AND email_permanent_failure = FALSE AND created_at < ? ORDER BY created_at ASC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, Receipt>(&query)
            .bind(older_than)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
