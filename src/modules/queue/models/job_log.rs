use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A job moves `Queued → Processing → Completed`, or `Queued → Processing →
/// Queued` (retried, attempts incremented) until `attempts == max_attempts`,
/// at which point it settles into `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Durable unit of work backing the `receipt-generation`,
/// `cloudinary-upload`, and `email-delivery` queues, plus the
/// `recovery-scan` cron job. `data` carries the worker's input
/// (always `{"receipt_id": ...}` for the fulfillment queues); `result`/
/// `error` are the worker's own JSON-shaped output once settled.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobLog {
    pub id: i64,
    pub queue_name: String,
    pub job_type: String,
    pub receipt_id: Option<i64>,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub data: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<serde_json::Value>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub is_recovery_job: bool,
    pub run_after: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl JobLog {
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
