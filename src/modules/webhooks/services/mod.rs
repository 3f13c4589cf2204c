pub mod webhook_service;

pub use webhook_service::{WebhookResponse, WebhookService};
