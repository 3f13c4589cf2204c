pub mod order_repository;
pub mod transaction_repository;

pub use order_repository::{MySqlOrderRepository, OrderRepository};
pub use transaction_repository::{MySqlTransactionRepository, TransactionRepository};
