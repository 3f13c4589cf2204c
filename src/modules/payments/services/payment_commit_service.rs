use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, Pool};
use tracing::{info, warn};

use crate::core::error::{AppError, AppResult};
use crate::modules::payments::models::{Order, PaymentTransaction};
use crate::modules::payments::repositories::{OrderRepository, TransactionRepository};
use crate::modules::queue::{JobBroker, RECEIPT_GENERATION};
use crate::modules::receipts::models::{Receipt, ReceiptStatus};
use crate::modules::receipts::repositories::ReceiptRepository;

fn is_unique_violation(error: &AppError) -> bool {
    matches!(error, AppError::Database(e) if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false))
}

const RECEIPT_NUMBER_MAX_RETRIES: u64 = 5;

/// Outcome of attempting to commit a normalized payment against an
/// order. Every variant except `Committed` is a terminal, non-retryable
/// business decision — none of them are `AppError`s, because none of
/// them are unexpected.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed { receipt_id: i64 },
    AlreadyProcessed,
    RequiresRefund,
    AmountMismatch,
    OrderNotFound,
}

pub struct PaymentCommitService {
    order_repo: Arc<dyn OrderRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    receipt_repo: Arc<dyn ReceiptRepository>,
    job_broker: JobBroker,
    pool: Pool<MySql>,
}

impl PaymentCommitService {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        receipt_repo: Arc<dyn ReceiptRepository>,
        job_broker: JobBroker,
        pool: Pool<MySql>,
    ) -> Self {
        Self {
            order_repo,
            transaction_repo,
            receipt_repo,
            job_broker,
            pool,
        }
    }

    /// §4.2: validates the order (read-only, outside any transaction),
    /// checks idempotency, then opens a single commit transaction that
    /// re-reads the order under a row lock (closing the TOCTOU window
    /// against a concurrent webhook) and writes the transaction, order,
    /// and receipt as one atomic commit. Enqueues the `receipt-generation`
    /// job only after that commit succeeds; returns without enqueueing
    /// anything for any outcome other than `Committed`.
    #[allow(clippy::too_many_arguments)]
    pub async fn commit_payment(
        &self,
        order_id: i64,
        transaction_id: &str,
        provider: &str,
        amount: Decimal,
        currency: &str,
        webhook_log_id: i64,
    ) -> AppResult<CommitOutcome> {
        let Some(order) = self.order_repo.find_by_id(order_id).await? else {
            return Ok(CommitOutcome::OrderNotFound);
        };

        if let Some(existing) = self
            .transaction_repo
            .find_by_transaction_id(transaction_id)
            .await?
        {
            warn!(
                transaction_id,
                order_id, existing_transaction = existing.id, "payment already processed"
            );
            return Ok(CommitOutcome::AlreadyProcessed);
        }

        if order.is_cancelled() {
            warn!(order_id, "payment received for a cancelled order");
            return Ok(CommitOutcome::RequiresRefund);
        }

        if order.is_paid() {
            return Ok(CommitOutcome::AlreadyProcessed);
        }

        if order.total != amount {
            warn!(
                order_id,
                order_total = %order.total,
                webhook_amount = %amount,
                "payment amount does not match order total"
            );
            return Ok(CommitOutcome::AmountMismatch);
        }

        let mut attempt = 0u64;
        let receipt = loop {
            let mut tx = self.pool.begin().await?;

            // §4.2 step 1: re-read and re-verify inside the transaction.
            let Some(locked_order) = self.order_repo.find_by_id_for_update(&mut tx, order_id).await? else {
                tx.rollback().await.ok();
                return Ok(CommitOutcome::OrderNotFound);
            };
            if locked_order.is_paid() {
                tx.rollback().await.ok();
                return Ok(CommitOutcome::AlreadyProcessed);
            }
            if locked_order.is_cancelled() {
                tx.rollback().await.ok();
                warn!(order_id, "order cancelled between validation and commit");
                return Ok(CommitOutcome::RequiresRefund);
            }

            let transaction = PaymentTransaction::succeeded(
                transaction_id,
                order_id,
                locked_order.user_id,
                locked_order.store_id,
                provider,
                amount,
                currency,
                webhook_log_id,
            );
            let transaction = match self.transaction_repo.create_in_tx(&mut tx, &transaction).await {
                Ok(t) => t,
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback().await.ok();
                    warn!(transaction_id, order_id, "concurrent committer won the transaction_id race");
                    return Ok(CommitOutcome::AlreadyProcessed);
                }
                Err(e) => return Err(e),
            };

            self.order_repo.mark_paid_in_tx(&mut tx, order_id).await?;

            let year = Utc::now().year();
            let count = self
                .receipt_repo
                .count_for_store_and_year_in_tx(&mut tx, locked_order.store_id, year)
                .await?;
            let sequence = count as u64 + 1 + attempt;
            let receipt = build_receipt(&locked_order, &transaction, year, sequence);

            match self.receipt_repo.insert_in_tx(&mut tx, &receipt).await {
                Ok(inserted) => {
                    tx.commit().await?;
                    break inserted;
                }
                Err(e) if is_unique_violation(&e) && attempt < RECEIPT_NUMBER_MAX_RETRIES => {
                    tx.rollback().await.ok();
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        self.job_broker
            .enqueue(
                RECEIPT_GENERATION,
                "render",
                Some(receipt.id),
                serde_json::json!({ "receipt_id": receipt.id }),
                false,
            )
            .await?;

        info!(order_id, receipt_id = receipt.id, "payment committed");
        Ok(CommitOutcome::Committed {
            receipt_id: receipt.id,
        })
    }

    /// §4.2 "payment failed" branch: records the failed transaction and
    /// transitions the order, with no receipt created.
    pub async fn record_failed_payment(
        &self,
        order_id: i64,
        transaction_id: &str,
        provider: &str,
        amount: Decimal,
        currency: &str,
        webhook_log_id: i64,
        reason: &str,
    ) -> AppResult<()> {
        let Some(order) = self.order_repo.find_by_id(order_id).await? else {
            return Err(AppError::not_found(format!("order {order_id} not found")));
        };

        let transaction = PaymentTransaction::failed(
            transaction_id,
            order_id,
            order.user_id,
            order.store_id,
            provider,
            amount,
            currency,
            webhook_log_id,
            reason,
        );
        self.transaction_repo.create(&transaction).await?;
        self.order_repo.mark_failed(order_id).await?;
        Ok(())
    }
}

/// Builds the `Receipt` row for sequence number `sequence` of
/// `(order.store_id, year)`, snapshotting the order at commit time.
/// `RCP-YYYY-NNNNNN` generation retries on a unique-constraint collision
/// (two commits racing for the same next sequence number) one transaction
/// attempt at a time, bounded by `RECEIPT_NUMBER_MAX_RETRIES` so a
/// persistently broken counter can't loop forever.
fn build_receipt(order: &Order, transaction: &PaymentTransaction, year: i32, sequence: u64) -> Receipt {
    let receipt_number = Receipt::format_receipt_number(year, sequence);
    let now = Utc::now();
    Receipt {
        id: 0,
        receipt_number,
        order_id: order.id,
        transaction_id: transaction.id,
        user_id: order.user_id,
        store_id: order.store_id,
        order_snapshot: order.freeze(),
        amount: transaction.amount,
        currency: transaction.currency.clone(),
        status: ReceiptStatus::Pending,
        paid_at: transaction.succeeded_at.unwrap_or(now),
        pdf_generated: false,
        pdf_generated_at: None,
        pdf_local_path: None,
        pdf_size_bytes: None,
        pdf_generation_attempts: 0,
        cloudinary_uploaded: false,
        cloudinary_uploaded_at: None,
        cloudinary_public_id: None,
        cloudinary_secure_url: None,
        cloudinary_signed_url: None,
        cloudinary_signed_url_expires_at: None,
        cloudinary_upload_attempts: 0,
        email_sent: false,
        email_sent_at: None,
        email_send_attempts: 0,
        email_permanent_failure: false,
        email_last_error: None,
        email_recipient: order.customer_email.clone(),
        created_at: now,
        updated_at: now,
    }
}
