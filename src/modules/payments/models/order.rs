use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `Order` never moves backward: `PendingPayment` → `Paid` (inside the
/// commit transaction) or `PaymentFailed`, or externally to `Cancelled`.
/// This service only ever performs the first two transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    PaymentFailed,
    Cancelled,
}

/// The subset of the storefront's order record the receipt pipeline
/// needs to validate and commit a payment. `total` is compared against
/// the webhook's reported amount as the amount-mismatch security check
/// in §4.2; `items`/`subtotal`/`tax`/`shipping`/`discount` make up the
/// line-item breakdown frozen into the receipt's `order_snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub store_id: i64,
    pub items: serde_json::Value,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub customer_email: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// `freeze(order)`: the immutable view carried on `Receipt.order_snapshot`,
    /// independent of any later mutation to the order row itself.
    pub fn freeze(&self) -> serde_json::Value {
        serde_json::json!({
            "order_number": self.order_number,
            "items": self.items,
            "subtotal": self.subtotal.to_string(),
            "tax": self.tax.to_string(),
            "shipping": self.shipping.to_string(),
            "discount": self.discount.to_string(),
            "total": self.total.to_string(),
            "currency": self.currency,
            "customer_email": self.customer_email,
            "customer_name": self.customer_name,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }
}
