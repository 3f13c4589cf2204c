// Per-queue configuration and exponential-backoff properties (spec §4.3-§4.6).
//
// `backoff_delay_secs`'s own doubling/floor behavior is covered next to its
// definition in `src/modules/queue/broker.rs`; this file checks the static
// per-queue tuning table matches the spec and that the formula holds as a
// property across arbitrary inputs.

use proptest::prelude::*;
use receiptor::modules::queue::{
    backoff_delay_secs, JobBroker, CLOUDINARY_UPLOAD, EMAIL_DELIVERY, RECEIPT_GENERATION,
    RECOVERY_SCAN,
};
use std::sync::Arc;

mod support {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use receiptor::core::error::AppResult;
    use receiptor::modules::queue::{JobLog, JobQueueRepository};

    /// Not exercised by these tests (no `enqueue`/`dequeue` calls), but
    /// `JobBroker::new` requires a repository to construct.
    pub struct UnusedRepository;

    #[async_trait]
    impl JobQueueRepository for UnusedRepository {
        async fn enqueue(&self, _job: &JobLog) -> AppResult<JobLog> {
            unimplemented!()
        }
        async fn find_by_id(&self, _id: i64) -> AppResult<Option<JobLog>> {
            unimplemented!()
        }
        async fn dequeue_and_lock(
            &self,
            _queue_name: &str,
            _at: DateTime<Utc>,
        ) -> AppResult<Option<JobLog>> {
            unimplemented!()
        }
        async fn mark_completed(&self, _id: i64, _result: serde_json::Value) -> AppResult<()> {
            unimplemented!()
        }
        async fn record_failure(
            &self,
            _id: i64,
            _error: serde_json::Value,
            _run_after: Option<DateTime<Utc>>,
        ) -> AppResult<()> {
            unimplemented!()
        }
    }
}

fn broker() -> JobBroker {
    JobBroker::new(Arc::new(support::UnusedRepository))
}

#[test]
fn receipt_generation_queue_matches_spec() {
    let config = broker().config_for(RECEIPT_GENERATION);
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.backoff_base_secs, 60);
    assert_eq!(config.concurrency, 2);
}

#[test]
fn cloudinary_upload_queue_matches_spec() {
    let config = broker().config_for(CLOUDINARY_UPLOAD);
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.backoff_base_secs, 120);
    assert_eq!(config.concurrency, 5);
}

#[test]
fn email_delivery_queue_matches_spec() {
    let config = broker().config_for(EMAIL_DELIVERY);
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.backoff_base_secs, 120);
    assert_eq!(config.concurrency, 10);
}

#[test]
fn recovery_scan_queue_runs_once_with_no_backoff() {
    let config = broker().config_for(RECOVERY_SCAN);
    assert_eq!(config.max_attempts, 1);
    assert_eq!(config.concurrency, 1);
}

#[test]
fn unknown_queue_name_falls_back_to_a_conservative_default() {
    let config = broker().config_for("some-future-queue");
    assert_eq!(config.max_attempts, 1);
    assert_eq!(config.concurrency, 1);
}

proptest! {
    /// `delay(base, n+1) >= delay(base, n)` for any base/attempt — the
    /// schedule never shrinks as a job keeps failing.
    #[test]
    fn backoff_is_non_decreasing_in_attempt(base in 1i64..10_000, attempt in 1i32..30) {
        let a = backoff_delay_secs(base, attempt);
        let b = backoff_delay_secs(base, attempt + 1);
        prop_assert!(b >= a);
    }

    #[test]
    fn backoff_never_overflows(base in 0i64..i64::MAX, attempt in -5i32..100) {
        let _ = backoff_delay_secs(base, attempt);
    }
}
