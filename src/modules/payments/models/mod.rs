pub mod order;
pub mod payment_transaction;

pub use order::{Order, OrderStatus};
pub use payment_transaction::{PaymentTransaction, TransactionStatus};
