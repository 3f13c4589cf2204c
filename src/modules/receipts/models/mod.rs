pub mod receipt;

pub use receipt::{Receipt, ReceiptStatus};
