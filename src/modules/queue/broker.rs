use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::core::error::AppResult;
use crate::modules::queue::models::JobLog;
use crate::modules::queue::repository::JobQueueRepository;

/// Static per-queue tuning, one entry per queue named in the fulfillment
/// pipeline plus the recovery sweep.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
    pub concurrency: usize,
}

pub const RECEIPT_GENERATION: &str = "receipt-generation";
pub const CLOUDINARY_UPLOAD: &str = "cloudinary-upload";
pub const EMAIL_DELIVERY: &str = "email-delivery";
pub const RECOVERY_SCAN: &str = "recovery-scan";

const JOB_TTL_DAYS: i64 = 7;

fn default_configs() -> HashMap<&'static str, QueueConfig> {
    HashMap::from([
        (
            RECEIPT_GENERATION,
            QueueConfig {
                max_attempts: 3,
                backoff_base_secs: 60,
                concurrency: 2,
            },
        ),
        (
            CLOUDINARY_UPLOAD,
            QueueConfig {
                max_attempts: 5,
                backoff_base_secs: 120,
                concurrency: 5,
            },
        ),
        (
            EMAIL_DELIVERY,
            QueueConfig {
                max_attempts: 5,
                backoff_base_secs: 120,
                concurrency: 10,
            },
        ),
        (
            RECOVERY_SCAN,
            QueueConfig {
                max_attempts: 1,
                backoff_base_secs: 0,
                concurrency: 1,
            },
        ),
    ])
}

/// `delay = base * 2^(attempt - 1)`, the exponential schedule used to
/// space out retries on `receipt-generation`, `cloudinary-upload`, and
/// `email-delivery`. `attempt` is the attempt number that just failed
/// (1-indexed); the result is when attempt `attempt + 1` may run.
pub fn backoff_delay_secs(base_secs: i64, attempt: i32) -> i64 {
    let attempt = attempt.max(1);
    base_secs.saturating_mul(1i64 << (attempt - 1).min(20))
}

#[derive(Clone)]
pub struct JobBroker {
    repo: Arc<dyn JobQueueRepository>,
    configs: Arc<HashMap<&'static str, QueueConfig>>,
}

impl JobBroker {
    pub fn new(repo: Arc<dyn JobQueueRepository>) -> Self {
        Self {
            repo,
            configs: Arc::new(default_configs()),
        }
    }

    pub fn config_for(&self, queue_name: &str) -> QueueConfig {
        self.configs
            .get(queue_name)
            .copied()
            .unwrap_or(QueueConfig {
                max_attempts: 1,
                backoff_base_secs: 60,
                concurrency: 1,
            })
    }

    /// Enqueues a job to run immediately. `is_recovery` jobs sort behind
    /// normal jobs with the same `run_after` (§4.6: re-enqueued work is
    /// lower priority than fresh work).
    pub async fn enqueue(
        &self,
        queue_name: &str,
        job_type: &str,
        receipt_id: Option<i64>,
        data: serde_json::Value,
        is_recovery: bool,
    ) -> AppResult<JobLog> {
        let config = self.config_for(queue_name);
        let now = Utc::now();
        let job = JobLog {
            id: 0,
            queue_name: queue_name.to_string(),
            job_type: job_type.to_string(),
            receipt_id,
            status: crate::modules::queue::models::JobStatus::Queued,
            attempts: 0,
            max_attempts: config.max_attempts,
            data,
            result: None,
            error: None,
            queued_at: now,
            started_at: None,
            completed_at: None,
            failed_at: None,
            is_recovery_job: is_recovery,
            run_after: now,
            expires_at: now + ChronoDuration::days(JOB_TTL_DAYS),
        };
        self.repo.enqueue(&job).await
    }

    pub async fn dequeue(&self, queue_name: &str) -> AppResult<Option<JobLog>> {
        self.repo.dequeue_and_lock(queue_name, Utc::now()).await
    }

    pub async fn complete(&self, job: &JobLog, result: serde_json::Value) -> AppResult<()> {
        self.repo.mark_completed(job.id, result).await
    }

    /// Records a failed attempt, requeuing with exponential backoff
    /// unless `job.attempts` (already incremented by `dequeue`) has hit
    /// `max_attempts`, in which case the job settles as `Failed`.
    pub async fn fail(&self, job: &JobLog, error: serde_json::Value) -> AppResult<()> {
        if job.is_exhausted() {
            self.repo.record_failure(job.id, error, None).await
        } else {
            let config = self.config_for(&job.queue_name);
            let delay = backoff_delay_secs(config.backoff_base_secs, job.attempts);
            let run_after = Utc::now() + ChronoDuration::seconds(delay);
            self.repo.record_failure(job.id, error, Some(run_after)).await
        }
    }

    pub fn now_is_ready(&self, job: &JobLog, at: DateTime<Utc>) -> bool {
        job.run_after <= at
    }
}
