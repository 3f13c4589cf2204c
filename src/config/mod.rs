pub mod database;
pub mod server;

use crate::core::{AppError, Result};
use dotenvy::dotenv;
use std::env;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    pub log_level: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,

    pub paystack_webhook_secret: String,
    pub generic_webhook_secret: String,
    pub mock_webhooks_enabled: bool,

    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from_address: String,

    pub receipts_local_dir: String,
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Loads configuration from environment variables, validating that
    /// every required variable is present before the server starts.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("APP_PORT must be a valid port number".to_string()))?;

        Ok(Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            server: ServerConfig::new(host, port),
            database: DatabaseConfig::from_env()?,

            paystack_webhook_secret: env::var("PAYSTACK_WEBHOOK_SECRET")
                .map_err(|_| AppError::Configuration("PAYSTACK_WEBHOOK_SECRET not set".to_string()))?,
            generic_webhook_secret: env::var("GENERIC_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "generic-dev-secret".to_string()),
            mock_webhooks_enabled: env::var("MOCK_WEBHOOKS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),

            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                .map_err(|_| AppError::Configuration("CLOUDINARY_CLOUD_NAME not set".to_string()))?,
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY")
                .map_err(|_| AppError::Configuration("CLOUDINARY_API_KEY not set".to_string()))?,
            cloudinary_api_secret: env::var("CLOUDINARY_API_SECRET")
                .map_err(|_| AppError::Configuration("CLOUDINARY_API_SECRET not set".to_string()))?,

            smtp_host: env::var("SMTP_HOST")
                .map_err(|_| AppError::Configuration("SMTP_HOST not set".to_string()))?,
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .map_err(|_| AppError::Configuration("SMTP_PORT must be a valid port number".to_string()))?,
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            smtp_from_address: env::var("SMTP_FROM_ADDRESS")
                .unwrap_or_else(|_| "receipts@example.com".to_string()),

            receipts_local_dir: env::var("RECEIPTS_LOCAL_DIR")
                .unwrap_or_else(|_| "uploads/receipts".to_string()),
            rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| AppError::Configuration("RATE_LIMIT_PER_MINUTE must be a valid number".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.mock_webhooks_enabled && self.app_env == "production" {
            return Err(AppError::Configuration(
                "MOCK_WEBHOOKS_ENABLED must not be set in production".to_string(),
            ));
        }
        Ok(())
    }
}
