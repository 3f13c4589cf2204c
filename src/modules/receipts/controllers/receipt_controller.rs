use std::sync::Arc;

use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use crate::core::error::AppError;
use crate::modules::receipts::repositories::ReceiptRepository;

pub struct ReceiptController {
    receipt_repo: Arc<dyn ReceiptRepository>,
}

#[derive(Debug, Serialize)]
struct RecoveryStatus {
    receipt_id: i64,
    status: crate::modules::receipts::models::ReceiptStatus,
    pdf_generated: bool,
    pdf_generation_attempts: i32,
    cloudinary_uploaded: bool,
    cloudinary_upload_attempts: i32,
    email_sent: bool,
    email_send_attempts: i32,
    email_permanent_failure: bool,
}

impl ReceiptController {
    pub fn new(receipt_repo: Arc<dyn ReceiptRepository>) -> Self {
        Self { receipt_repo }
    }

    /// GET /receipts/{id}
    pub async fn show(&self, id: web::Path<i64>) -> Result<HttpResponse, AppError> {
        let receipt = self
            .receipt_repo
            .find_by_id(id.into_inner())
            .await?
            .ok_or_else(|| AppError::not_found("receipt not found"))?;

        Ok(HttpResponse::Ok().json(receipt))
    }

    /// GET /receipts/{id}/recovery-status — the per-stage attempt
    /// counters the recovery sweep and operators both read to judge
    /// whether a receipt is progressing or stuck.
    pub async fn recovery_status(&self, id: web::Path<i64>) -> Result<HttpResponse, AppError> {
        let receipt = self
            .receipt_repo
            .find_by_id(id.into_inner())
            .await?
            .ok_or_else(|| AppError::not_found("receipt not found"))?;

        Ok(HttpResponse::Ok().json(RecoveryStatus {
            receipt_id: receipt.id,
            status: receipt.status,
            pdf_generated: receipt.pdf_generated,
            pdf_generation_attempts: receipt.pdf_generation_attempts,
            cloudinary_uploaded: receipt.cloudinary_uploaded,
            cloudinary_upload_attempts: receipt.cloudinary_upload_attempts,
            email_sent: receipt.email_sent,
            email_send_attempts: receipt.email_send_attempts,
            email_permanent_failure: receipt.email_permanent_failure,
        }))
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/receipts")
            .route("/{id}", web::get().to(handle_show))
            .route("/{id}/recovery-status", web::get().to(handle_recovery_status)),
    );
}

async fn handle_show(
    id: web::Path<i64>,
    controller: web::Data<ReceiptController>,
) -> Result<HttpResponse, AppError> {
    controller.show(id).await
}

async fn handle_recovery_status(
    id: web::Path<i64>,
    controller: web::Data<ReceiptController>,
) -> Result<HttpResponse, AppError> {
    controller.recovery_status(id).await
}
