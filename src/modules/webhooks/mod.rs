pub mod controllers;
pub mod models;
pub mod providers;
pub mod repositories;
pub mod services;

pub use models::WebhookEvent;
pub use providers::WebhookProvider;
