use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cron::Schedule;
use tracing::{error, info, warn};

use crate::core::error::AppResult;
use crate::modules::queue::{JobBroker, CLOUDINARY_UPLOAD, EMAIL_DELIVERY, RECEIPT_GENERATION};
use crate::modules::receipts::models::Receipt;
use crate::modules::receipts::repositories::ReceiptRepository;

const SCAN_LIMIT: i64 = 50;

// §4.6 re-enqueue scan windows: how long a receipt can sit on a stage
// before the sweep treats it as stuck and re-enqueues its job.
const RENDER_STUCK_AFTER_MINUTES: i64 = 15;
const UPLOAD_STUCK_AFTER_MINUTES: i64 = 30;
const EMAIL_STUCK_AFTER_MINUTES: i64 = 30;

// §4.6 critical-failure age gates: a separate, longer threshold. A
// candidate only gets flagged for operator attention once it has both
// exhausted its attempt budget AND aged past this point — short of that
// it's still re-enqueued.
const RENDER_CRITICAL_AFTER_HOURS: i64 = 1;
const UPLOAD_CRITICAL_AFTER_HOURS: i64 = 4;
const EMAIL_CRITICAL_AFTER_HOURS: i64 = 4;

/// §4.6: periodic sweep re-enqueueing fulfillment jobs that fell through
/// (a worker crashed mid-job, a job expired before it was claimed) and
/// flagging receipts that have burned through their attempt budget for
/// operator attention. Never mutates a receipt past its attempt cap —
/// only logs it.
pub struct RecoveryController {
    receipt_repo: Arc<dyn ReceiptRepository>,
    job_broker: JobBroker,
}

impl RecoveryController {
    pub fn new(receipt_repo: Arc<dyn ReceiptRepository>, job_broker: JobBroker) -> Self {
        Self {
            receipt_repo,
            job_broker,
        }
    }

    pub async fn run_once(&self) -> AppResult<RecoverySweepReport> {
        let now = Utc::now();
        let mut report = RecoverySweepReport::default();

        self.sweep_stage(
            &mut report.render_requeued,
            &mut report.critical_failures,
            self.receipt_repo
                .find_stuck_on_pdf(now - ChronoDuration::minutes(RENDER_STUCK_AFTER_MINUTES), SCAN_LIMIT)
                .await?,
            RECEIPT_GENERATION,
            "render",
            |r| r.pdf_generation_attempts,
            self.job_broker.config_for(RECEIPT_GENERATION).max_attempts,
            now - ChronoDuration::hours(RENDER_CRITICAL_AFTER_HOURS),
        )
        .await?;

        self.sweep_stage(
            &mut report.upload_requeued,
            &mut report.critical_failures,
            self.receipt_repo
                .find_stuck_on_cloudinary(now - ChronoDuration::minutes(UPLOAD_STUCK_AFTER_MINUTES), SCAN_LIMIT)
                .await?,
            CLOUDINARY_UPLOAD,
            "upload",
            |r| r.cloudinary_upload_attempts,
            self.job_broker.config_for(CLOUDINARY_UPLOAD).max_attempts,
            now - ChronoDuration::hours(UPLOAD_CRITICAL_AFTER_HOURS),
        )
        .await?;

        self.sweep_stage(
            &mut report.email_requeued,
            &mut report.critical_failures,
            self.receipt_repo
                .find_stuck_on_email(now - ChronoDuration::minutes(EMAIL_STUCK_AFTER_MINUTES), SCAN_LIMIT)
                .await?,
            EMAIL_DELIVERY,
            "send",
            |r| r.email_send_attempts,
            self.job_broker.config_for(EMAIL_DELIVERY).max_attempts,
            now - ChronoDuration::hours(EMAIL_CRITICAL_AFTER_HOURS),
        )
        .await?;

        if !report.critical_failures.is_empty() {
            warn!(count = report.critical_failures.len(), "recovery sweep found critical failures");
        }
        info!(
            render = report.render_requeued,
            upload = report.upload_requeued,
            email = report.email_requeued,
            critical = report.critical_failures.len(),
            "recovery sweep complete"
        );

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn sweep_stage(
        &self,
        requeued_counter: &mut u32,
        critical_failures: &mut Vec<i64>,
        candidates: Vec<Receipt>,
        queue_name: &str,
        job_type: &str,
        attempts_of: impl Fn(&Receipt) -> i32,
        max_attempts: i32,
        critical_before: DateTime<Utc>,
    ) -> AppResult<()> {
        for receipt in candidates {
            if attempts_of(&receipt) >= max_attempts && receipt.created_at < critical_before {
                critical_failures.push(receipt.id);
                continue;
            }

            self.job_broker
                .enqueue(
                    queue_name,
                    job_type,
                    Some(receipt.id),
                    serde_json::json!({ "receipt_id": receipt.id }),
                    true,
                )
                .await?;
            *requeued_counter += 1;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecoverySweepReport {
    pub render_requeued: u32,
    pub upload_requeued: u32,
    pub email_requeued: u32,
    pub critical_failures: Vec<i64>,
}

/// Spawns a background task that runs `RecoveryController::run_once`
/// every time `cron_expr` fires (`*/15 * * * *` per §4.6).
pub fn spawn_recovery_scheduler(controller: Arc<RecoveryController>, cron_expr: &str) -> AppResult<()> {
    let schedule = Schedule::from_str(cron_expr)
        .map_err(|e| crate::core::error::AppError::Configuration(format!("invalid recovery cron expression: {e}")))?;

    tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                error!("recovery cron schedule produced no upcoming fire time");
                break;
            };
            let now = Utc::now();
            let delay = (next - now).to_std().unwrap_or(std::time::Duration::from_secs(60));
            tokio::time::sleep(delay).await;

            if let Err(e) = controller.run_once().await {
                error!(error = %e, "recovery sweep failed");
            }
        }
    });

    Ok(())
}
