pub mod webhook_log_repository;

pub use webhook_log_repository::{MySqlWebhookLogRepository, WebhookLogRepository};
