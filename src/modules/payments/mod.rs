pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Order, OrderStatus, PaymentTransaction, TransactionStatus};
