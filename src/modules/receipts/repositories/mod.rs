pub mod receipt_repository;

pub use receipt_repository::{MySqlReceiptRepository, ReceiptRepository};
