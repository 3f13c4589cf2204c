use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};

use crate::core::error::AppResult;
use crate::modules::queue::models::{JobLog, JobStatus};

const COLUMNS: &str = r#"
    id, queue_name, job_type, receipt_id, status, attempts, max_attempts,
    data, result, error, queued_at, started_at, completed_at, failed_at,
    is_recovery_job, run_after, expires_at
"#;

/// Durable job queue backed by a relational table rather than a broker
/// process. `dequeue_and_lock` claims one row per call using
/// `SELECT ... FOR UPDATE SKIP LOCKED` inside its own transaction, so
/// concurrent workers never race on the same job and a crashed worker's
/// claim is simply released back to the pool once its transaction rolls
/// back.
#[async_trait]
pub trait JobQueueRepository: Send + Sync {
    async fn enqueue(&self, job: &JobLog) -> AppResult<JobLog>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<JobLog>>;

    /// Claims and returns the oldest runnable job for `queue_name`, or
    /// `None` if nothing is ready. Marks it `Processing` before
    /// returning it.
    async fn dequeue_and_lock(&self, queue_name: &str, now: DateTime<Utc>) -> AppResult<Option<JobLog>>;

    async fn mark_completed(&self, id: i64, result: serde_json::Value) -> AppResult<()>;

    /// Records a failed attempt. If `job.attempts + 1 < max_attempts`,
    /// the job is requeued at `run_after` (the caller's backoff
    /// computation); otherwise it settles into `Failed`.
    async fn record_failure(
        &self,
        id: i64,
        error: serde_json::Value,
        next_run_after: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
}

pub struct MySqlJobQueueRepository {
    pool: Pool<MySql>,
}

impl MySqlJobQueueRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueueRepository for MySqlJobQueueRepository {
    async fn enqueue(&self, job: &JobLog) -> AppResult<JobLog> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_logs (
                queue_name, job_type, receipt_id, status, attempts, max_attempts,
                data, queued_at, is_recovery_job, run_after, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.queue_name)
        .bind(&job.job_type)
        .bind(job.receipt_id)
        .bind(JobStatus::Queued)
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(&job.data)
        .bind(job.queued_at)
        .bind(job.is_recovery_job)
        .bind(job.run_after)
        .bind(job.expires_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i64;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| crate::core::error::AppError::internal("job vanished after insert"))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<JobLog>> {
        let query = format!("SELECT {COLUMNS} FROM job_logs WHERE id = ?");
        let job = sqlx::query_as::<_, JobLog>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn dequeue_and_lock(&self, queue_name: &str, now: DateTime<Utc>) -> AppResult<Option<JobLog>> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {COLUMNS} FROM job_logs \
             WHERE queue_name = ? AND status = ? AND run_after <= ? \
             ORDER BY is_recovery_job ASC, queued_at ASC \
             LIMIT 1 FOR UPDATE SKIP LOCKED"
        );
        let candidate = sqlx::query_as::<_, JobLog>(&select)
            .bind(queue_name)
            .bind(JobStatus::Queued)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(job) = candidate else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE job_logs SET status = ?, started_at = ?, attempts = attempts + 1 WHERE id = ?",
        )
        .bind(JobStatus::Processing)
        .bind(now)
        .bind(job.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(job.id).await
    }

    async fn mark_completed(&self, id: i64, result: serde_json::Value) -> AppResult<()> {
        sqlx::query(
            "UPDATE job_logs SET status = ?, result = ?, completed_at = UTC_TIMESTAMP() WHERE id = ?",
        )
        .bind(JobStatus::Completed)
        .bind(result)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: i64,
        error: serde_json::Value,
        next_run_after: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        match next_run_after {
            Some(run_after) => {
                sqlx::query(
                    "UPDATE job_logs SET status = ?, error = ?, run_after = ? WHERE id = ?",
                )
                .bind(JobStatus::Queued)
                .bind(error)
                .bind(run_after)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE job_logs SET status = ?, error = ?, failed_at = UTC_TIMESTAMP() WHERE id = ?",
                )
                .bind(JobStatus::Failed)
                .bind(error)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}
