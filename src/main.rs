mod config;
mod core;
mod middleware;
mod modules;

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use middleware::{InMemoryRateLimiter, MetricsCollector, MetricsMiddleware, RateLimitMiddleware, RequestId};
use modules::fulfillment::{spawn_email_workers, spawn_render_workers, spawn_upload_workers};
use modules::fulfillment::{CloudinaryArtifactStore, LettreEmailTransport};
use modules::health::controllers::health_controller;
use modules::health::controllers::metrics::get_metrics;
use modules::payments::repositories::{MySqlOrderRepository, MySqlTransactionRepository};
use modules::payments::services::PaymentCommitService;
use modules::queue::{JobBroker, MySqlJobQueueRepository};
use modules::receipts::controllers::receipt_controller::configure_routes as configure_receipt_routes;
use modules::receipts::controllers::ReceiptController;
use modules::receipts::repositories::MySqlReceiptRepository;
use modules::recovery::{spawn_recovery_scheduler, RecoveryController};
use modules::webhooks::controllers::webhook_controller::configure_routes as configure_webhook_routes;
use modules::webhooks::controllers::WebhookController;
use modules::webhooks::providers::{GenericProvider, MockProvider, PaystackProvider, WebhookProvider};
use modules::webhooks::repositories::MySqlWebhookLogRepository;
use modules::webhooks::services::WebhookService;

const RECOVERY_CRON: &str = "0 */15 * * * *";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "receiptor=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");
    let config = Arc::new(config);

    tracing::info!("Starting Receiptor payment webhook & fulfillment platform");
    tracing::info!("Environment: {}", config.app_env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database pool initialized ({} connections)", config.database.pool_size);

    let order_repo: Arc<dyn modules::payments::repositories::OrderRepository> =
        Arc::new(MySqlOrderRepository::new(db_pool.clone()));
    let transaction_repo: Arc<dyn modules::payments::repositories::TransactionRepository> =
        Arc::new(MySqlTransactionRepository::new(db_pool.clone()));
    let receipt_repo: Arc<dyn modules::receipts::repositories::ReceiptRepository> =
        Arc::new(MySqlReceiptRepository::new(db_pool.clone()));
    let webhook_log_repo: Arc<dyn modules::webhooks::repositories::WebhookLogRepository> =
        Arc::new(MySqlWebhookLogRepository::new(db_pool.clone()));
    let job_queue_repo: Arc<dyn modules::queue::JobQueueRepository> =
        Arc::new(MySqlJobQueueRepository::new(db_pool.clone()));

    let job_broker = JobBroker::new(job_queue_repo);

    let commit_service = Arc::new(PaymentCommitService::new(
        order_repo.clone(),
        transaction_repo.clone(),
        receipt_repo.clone(),
        job_broker.clone(),
        db_pool.clone(),
    ));

    let mut providers: HashMap<String, Arc<dyn WebhookProvider>> = HashMap::new();
    providers.insert(
        "paystack".to_string(),
        Arc::new(PaystackProvider::new(config.paystack_webhook_secret.clone())),
    );
    providers.insert(
        "generic".to_string(),
        Arc::new(GenericProvider::new(config.generic_webhook_secret.clone())),
    );
    providers.insert("mock".to_string(), Arc::new(MockProvider));

    let webhook_service = Arc::new(WebhookService::new(
        providers,
        webhook_log_repo,
        commit_service,
        config.mock_webhooks_enabled,
    ));
    let webhook_controller = web::Data::new(WebhookController::new(webhook_service));
    let receipt_controller = web::Data::new(ReceiptController::new(receipt_repo.clone()));

    let artifact_store: Arc<dyn modules::fulfillment::ArtifactStore> =
        Arc::new(CloudinaryArtifactStore::new(&config));
    let email_transport: Arc<dyn modules::fulfillment::EmailTransport> = Arc::new(
        LettreEmailTransport::new(&config).expect("Failed to build SMTP transport"),
    );

    spawn_render_workers(job_broker.clone(), receipt_repo.clone(), config.clone());
    spawn_upload_workers(job_broker.clone(), receipt_repo.clone(), artifact_store);
    spawn_email_workers(job_broker.clone(), receipt_repo.clone(), email_transport);

    let recovery_controller = Arc::new(RecoveryController::new(receipt_repo, job_broker));
    spawn_recovery_scheduler(recovery_controller, RECOVERY_CRON)
        .expect("Failed to start recovery scheduler");

    let metrics = MetricsCollector::new();
    let rate_limiter: Arc<dyn middleware::RateLimiter> =
        Arc::new(InMemoryRateLimiter::new(config.rate_limit_per_minute));

    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(webhook_controller.clone())
            .app_data(receipt_controller.clone())
            .app_data(web::Data::new(metrics.clone()))
            .wrap(RequestId)
            .wrap(MetricsMiddleware::new(metrics.clone()))
            .wrap(RateLimitMiddleware::new(rate_limiter.clone()))
            .configure(health_controller::configure)
            .configure(configure_webhook_routes)
            .configure(configure_receipt_routes)
            .route("/metrics", web::get().to(get_metrics))
    })
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);
    server.await
}
