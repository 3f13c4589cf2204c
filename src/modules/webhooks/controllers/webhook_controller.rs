use actix_web::{web, HttpRequest, HttpResponse, Result};
use std::sync::Arc;
use tracing::info;

use crate::core::error::AppError;
use crate::modules::webhooks::services::WebhookService;

/// Receives inbound payment-provider deliveries. One route handles
/// every provider — `{provider}` selects which `WebhookProvider` the
/// service dispatches to.
pub struct WebhookController {
    service: Arc<WebhookService>,
}

impl WebhookController {
    pub fn new(service: Arc<WebhookService>) -> Self {
        Self { service }
    }

    /// POST /webhooks/payment/{provider}
    pub async fn receive(
        &self,
        provider: web::Path<String>,
        payload: web::Bytes,
        req: HttpRequest,
    ) -> Result<HttpResponse, AppError> {
        let provider = provider.into_inner();

        info!(provider = %provider, payload_size = payload.len(), "received webhook");

        let webhook_id = header_str(&req, "x-webhook-id");
        let signature = header_str(&req, "x-signature");

        let response = self
            .service
            .handle(&provider, webhook_id.as_deref(), signature.as_deref(), &payload)
            .await?;

        Ok(HttpResponse::Ok().json(response))
    }
}

fn header_str(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhooks").route("/payment/{provider}", web::post().to(handle_webhook)),
    );
}

async fn handle_webhook(
    provider: web::Path<String>,
    payload: web::Bytes,
    req: HttpRequest,
    controller: web::Data<WebhookController>,
) -> Result<HttpResponse, AppError> {
    controller.receive(provider, payload, req).await
}
