use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, Pool, Transaction};

use crate::core::error::AppResult;
use crate::modules::payments::models::{Order, OrderStatus};

/// Repository for the `Order` side of the payment commit. Orders are
/// never inserted by this service; only `find_by_id` (used for the
/// initial validation read), `find_by_id_for_update`/`mark_paid_in_tx`
/// (the re-read and transition inside the commit transaction), and the
/// terminal `mark_paid`/`mark_failed` transitions are needed.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Order>>;

    async fn find_by_order_number(&self, order_number: &str) -> AppResult<Option<Order>>;

    /// Transitions a `pending_payment` order to `paid`. No-ops (affects
    /// zero rows, which the caller treats as already-handled) if the
    /// order has moved on already, which makes the call idempotent for
    /// a retried webhook.
    async fn mark_paid(&self, id: i64) -> AppResult<()>;

    async fn mark_failed(&self, id: i64) -> AppResult<()>;

    /// Re-reads the order with a row lock inside the caller's commit
    /// transaction, closing the TOCTOU window between the pre-transaction
    /// validation read and the writes that follow.
    async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: i64,
    ) -> AppResult<Option<Order>>;

    /// Same transition as `mark_paid`, scoped to the caller's transaction.
    async fn mark_paid_in_tx(&self, tx: &mut Transaction<'_, MySql>, id: i64) -> AppResult<()>;
}

pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, user_id, store_id, items, subtotal, tax,
                   shipping, discount, total, currency, customer_email,
                   customer_name, status, paid_at, cancelled_at, created_at,
                   updated_at
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn find_by_order_number(&self, order_number: &str) -> AppResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, user_id, store_id, items, subtotal, tax,
                   shipping, discount, total, currency, customer_email,
                   customer_name, status, paid_at, cancelled_at, created_at,
                   updated_at
            FROM orders
            WHERE order_number = ?
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn mark_paid(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, paid_at = ?, updated_at = UTC_TIMESTAMP()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(OrderStatus::Paid)
        .bind(Utc::now())
        .bind(id)
        .bind(OrderStatus::PendingPayment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, updated_at = UTC_TIMESTAMP()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(OrderStatus::PaymentFailed)
        .bind(id)
        .bind(OrderStatus::PendingPayment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: i64,
    ) -> AppResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, user_id, store_id, items, subtotal, tax,
                   shipping, discount, total, currency, customer_email,
                   customer_name, status, paid_at, cancelled_at, created_at,
                   updated_at
            FROM orders
            WHERE id = ?
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(order)
    }

    async fn mark_paid_in_tx(&self, tx: &mut Transaction<'_, MySql>, id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, paid_at = ?, updated_at = UTC_TIMESTAMP()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(OrderStatus::Paid)
        .bind(Utc::now())
        .bind(id)
        .bind(OrderStatus::PendingPayment)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
