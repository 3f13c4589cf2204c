use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::error::AppResult;
use crate::modules::fulfillment::email::{EmailFailureKind, EmailTransport};
use crate::modules::fulfillment::render::render_receipt_pdf;
use crate::modules::fulfillment::upload::ArtifactStore;
use crate::modules::queue::{JobBroker, JobLog, CLOUDINARY_UPLOAD, EMAIL_DELIVERY, RECEIPT_GENERATION};
use crate::modules::receipts::repositories::ReceiptRepository;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// §4.7: the only place that ever sets `Receipt.status = Completed`.
/// Callable from both the upload and email workers (whichever finishes
/// last), and a no-op if any stage isn't done yet or the receipt has
/// already completed.
pub async fn mark_completed(receipt_repo: &dyn ReceiptRepository, receipt_id: i64) -> AppResult<()> {
    if let Some(receipt) = receipt_repo.find_by_id(receipt_id).await? {
        if receipt.all_stages_complete() && !receipt.is_completed() {
            receipt_repo.mark_completed(receipt_id).await?;
        }
    }
    Ok(())
}

/// Spawns `concurrency` polling loops against `queue_name`, each
/// running `process` on every job it claims. A job that throws is
/// requeued (or settled `Failed`) by `broker.fail`; a job that returns
/// `Ok` is settled `Completed`.
fn spawn_pool<F, Fut>(
    broker: JobBroker,
    queue_name: &'static str,
    concurrency: usize,
    process: F,
) where
    F: Fn(JobLog) -> Fut + Send + Sync + Clone + 'static,
    Fut: std::future::Future<Output = AppResult<serde_json::Value>> + Send + 'static,
{
    for worker_index in 0..concurrency {
        let broker = broker.clone();
        let process = process.clone();
        tokio::spawn(async move {
            loop {
                match broker.dequeue(queue_name).await {
                    Ok(Some(job)) => {
                        let job_id = job.id;
                        match process(job.clone()).await {
                            Ok(result) => {
                                if let Err(e) = broker.complete(&job, result).await {
                                    error!(queue = queue_name, job_id, error = %e, "failed to mark job completed");
                                }
                            }
                            Err(e) => {
                                warn!(queue = queue_name, job_id, worker_index, error = %e, "job failed");
                                if let Err(e2) = broker.fail(&job, serde_json::json!({ "message": e.to_string() })).await {
                                    error!(queue = queue_name, job_id, error = %e2, "failed to record job failure");
                                }
                            }
                        }
                    }
                    Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
                    Err(e) => {
                        error!(queue = queue_name, error = %e, "failed to dequeue job");
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                }
            }
        });
    }
}

pub fn spawn_render_workers(
    broker: JobBroker,
    receipt_repo: Arc<dyn ReceiptRepository>,
    config: Arc<Config>,
) {
    let concurrency = broker.config_for(RECEIPT_GENERATION).concurrency;
    let enqueue_broker = broker.clone();
    spawn_pool(broker, RECEIPT_GENERATION, concurrency, move |job| {
        let receipt_repo = receipt_repo.clone();
        let config = config.clone();
        let broker = enqueue_broker.clone();
        async move {
            let receipt_id = job
                .receipt_id
                .ok_or_else(|| crate::core::error::AppError::internal("render job missing receipt_id"))?;
            let receipt = receipt_repo
                .find_by_id(receipt_id)
                .await?
                .ok_or_else(|| crate::core::error::AppError::internal("receipt vanished before render"))?;

            if receipt.pdf_generated {
                info!(receipt_id, "pdf already generated, skipping render");
            } else {
                let (path, size_bytes) = render_receipt_pdf(&receipt, &config.receipts_local_dir)?;
                receipt_repo
                    .update_pdf_stage(receipt_id, &path.to_string_lossy(), size_bytes, job.attempts)
                    .await?;
                info!(receipt_id, path = %path.display(), "receipt pdf rendered");

                // §4.3 step 5 / §5: this worker is the sole producer of both
                // downstream queues.
                broker
                    .enqueue(
                        CLOUDINARY_UPLOAD,
                        "upload",
                        Some(receipt_id),
                        serde_json::json!({ "receipt_id": receipt_id }),
                        false,
                    )
                    .await?;
                broker
                    .enqueue(
                        EMAIL_DELIVERY,
                        "send",
                        Some(receipt_id),
                        serde_json::json!({ "receipt_id": receipt_id }),
                        false,
                    )
                    .await?;
            }

            Ok(serde_json::json!({ "receipt_id": receipt_id }))
        }
    });
}

pub fn spawn_upload_workers(
    broker: JobBroker,
    receipt_repo: Arc<dyn ReceiptRepository>,
    artifact_store: Arc<dyn ArtifactStore>,
) {
    let concurrency = broker.config_for(CLOUDINARY_UPLOAD).concurrency;
    spawn_pool(broker, CLOUDINARY_UPLOAD, concurrency, move |job| {
        let receipt_repo = receipt_repo.clone();
        let artifact_store = artifact_store.clone();
        async move {
            let receipt_id = job
                .receipt_id
                .ok_or_else(|| crate::core::error::AppError::internal("upload job missing receipt_id"))?;
            let receipt = receipt_repo
                .find_by_id(receipt_id)
                .await?
                .ok_or_else(|| crate::core::error::AppError::internal("receipt vanished before upload"))?;

            if receipt.cloudinary_uploaded {
                info!(receipt_id, "already uploaded, skipping");
            } else {
                let path = receipt
                    .pdf_local_path
                    .clone()
                    .ok_or_else(|| crate::core::error::AppError::internal("receipt has no local pdf to upload"))?;
                let bytes = std::fs::read(&path)
                    .map_err(|e| crate::core::error::AppError::internal(format!("failed to read pdf: {e}")))?;

                let uploaded = artifact_store
                    .upload(&receipt.receipt_number, bytes)
                    .await?;

                receipt_repo
                    .update_cloudinary_stage(
                        receipt_id,
                        &uploaded.public_id,
                        &uploaded.secure_url,
                        &uploaded.signed_url,
                        uploaded.signed_url_expires_at,
                        job.attempts,
                    )
                    .await?;
                mark_completed(receipt_repo.as_ref(), receipt_id).await?;
                info!(receipt_id, "receipt uploaded to cloudinary");
            }

            Ok(serde_json::json!({ "receipt_id": receipt_id }))
        }
    });
}

pub fn spawn_email_workers(
    broker: JobBroker,
    receipt_repo: Arc<dyn ReceiptRepository>,
    email_transport: Arc<dyn EmailTransport>,
) {
    let concurrency = broker.config_for(EMAIL_DELIVERY).concurrency;
    spawn_pool(broker, EMAIL_DELIVERY, concurrency, move |job| {
        let receipt_repo = receipt_repo.clone();
        let email_transport = email_transport.clone();
        async move {
            let receipt_id = job
                .receipt_id
                .ok_or_else(|| crate::core::error::AppError::internal("email job missing receipt_id"))?;
            let receipt = receipt_repo
                .find_by_id(receipt_id)
                .await?
                .ok_or_else(|| crate::core::error::AppError::internal("receipt vanished before email"))?;

            if receipt.email_sent || receipt.email_permanent_failure {
                info!(receipt_id, "email already settled, skipping");
                return Ok(serde_json::json!({ "receipt_id": receipt_id, "skipped": true }));
            }

            let path = receipt
                .pdf_local_path
                .clone()
                .ok_or_else(|| crate::core::error::AppError::internal("receipt has no local pdf to email"))?;
            let bytes = std::fs::read(&path)
                .map_err(|e| crate::core::error::AppError::internal(format!("failed to read pdf: {e}")))?;

            match email_transport.send_receipt(&receipt, bytes).await {
                Ok(()) => {
                    receipt_repo.update_email_stage(receipt_id, job.attempts).await?;
                    mark_completed(receipt_repo.as_ref(), receipt_id).await?;
                    info!(receipt_id, "receipt email sent");
                    Ok(serde_json::json!({ "receipt_id": receipt_id }))
                }
                Err(send_error) => {
                    let permanent = send_error.kind == EmailFailureKind::InvalidEmail;
                    receipt_repo
                        .record_email_failure(receipt_id, job.attempts, permanent, &send_error.message)
                        .await?;
                    if permanent {
                        // Don't burn a retry on an address that will never work.
                        Ok(serde_json::json!({ "receipt_id": receipt_id, "permanent_failure": true }))
                    } else {
                        Err(crate::core::error::AppError::gateway(send_error.message))
                    }
                }
            }
        }
    });
}
