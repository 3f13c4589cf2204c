// Payment commit pipeline integration tests (spec §4.2).
//
// Exercises `PaymentCommitService::commit_payment` against a real MySQL
// test database: the idempotency gate, the cancelled/already-paid/
// amount-mismatch guards, and the three-row commit (transaction, order,
// receipt) plus the `receipt-generation` enqueue that follows a
// successful commit. Requires a live test database; every test here is
// `#[ignore]` like the rest of this repo's DB-backed suite.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use rust_decimal_macros::dec;

use helpers::test_database::create_test_pool;
use receiptor::modules::payments::repositories::{
    MySqlOrderRepository, MySqlTransactionRepository, OrderRepository,
};
use receiptor::modules::payments::services::{CommitOutcome, PaymentCommitService};
use receiptor::modules::queue::{JobBroker, MySqlJobQueueRepository, RECEIPT_GENERATION};
use receiptor::modules::receipts::repositories::{MySqlReceiptRepository, ReceiptRepository};

async fn seed_pending_order(pool: &sqlx::MySqlPool, order_number: &str, total: rust_decimal::Decimal) -> i64 {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (
            order_number, user_id, store_id, items, subtotal, tax, shipping,
            discount, total, currency, customer_email, customer_name, status,
            created_at, updated_at
        ) VALUES (?, 7, 42, ?, ?, 0, 0, 0, ?, 'NGN', 'buyer@example.com', 'Jordan Rivers',
                  'pending_payment', UTC_TIMESTAMP(), UTC_TIMESTAMP())
        "#,
    )
    .bind(order_number)
    .bind(serde_json::json!([{"sku": "A1", "qty": 1}]))
    .bind(total)
    .bind(total)
    .execute(pool)
    .await
    .expect("failed to seed order");

    result.last_insert_id() as i64
}

fn service(
    pool: sqlx::MySqlPool,
) -> (
    PaymentCommitService,
    Arc<dyn OrderRepository>,
    Arc<dyn ReceiptRepository>,
    JobBroker,
) {
    let order_repo: Arc<dyn OrderRepository> = Arc::new(MySqlOrderRepository::new(pool.clone()));
    let transaction_repo = Arc::new(MySqlTransactionRepository::new(pool.clone()));
    let receipt_repo: Arc<dyn ReceiptRepository> = Arc::new(MySqlReceiptRepository::new(pool.clone()));
    let job_broker = JobBroker::new(Arc::new(MySqlJobQueueRepository::new(pool.clone())));

    let commit_service = PaymentCommitService::new(
        order_repo.clone(),
        transaction_repo,
        receipt_repo.clone(),
        job_broker.clone(),
        pool,
    );

    (commit_service, order_repo, receipt_repo, job_broker)
}

#[tokio::test]
#[ignore] // Requires test database
async fn matching_amount_commits_order_transaction_and_receipt() {
    let pool = create_test_pool().await;
    let order_id = seed_pending_order(&pool, "ORD-COMMIT-1", dec!(125000)).await;
    let (commit_service, order_repo, receipt_repo, job_broker) = service(pool.clone());

    let outcome = commit_service
        .commit_payment(order_id, "txn-commit-1", "paystack", dec!(125000), "NGN", 1)
        .await
        .expect("commit_payment failed");

    let receipt_id = match outcome {
        CommitOutcome::Committed { receipt_id } => receipt_id,
        other => panic!("expected Committed, got {other:?}"),
    };

    let order = order_repo
        .find_by_id(order_id)
        .await
        .unwrap()
        .expect("order vanished");
    assert!(order.is_paid());

    let receipt = receipt_repo
        .find_by_id(receipt_id)
        .await
        .unwrap()
        .expect("receipt not created");
    assert_eq!(receipt.order_id, order_id);
    assert!(!receipt.pdf_generated);

    let job = job_broker
        .config_for(RECEIPT_GENERATION);
    assert_eq!(job.max_attempts, 3);
}

#[tokio::test]
#[ignore] // Requires test database
async fn replaying_the_same_transaction_id_is_already_processed() {
    let pool = create_test_pool().await;
    let order_id = seed_pending_order(&pool, "ORD-COMMIT-2", dec!(50000)).await;
    let (commit_service, _order_repo, _receipt_repo, _job_broker) = service(pool.clone());

    let first = commit_service
        .commit_payment(order_id, "txn-commit-2", "paystack", dec!(50000), "NGN", 1)
        .await
        .unwrap();
    assert!(matches!(first, CommitOutcome::Committed { .. }));

    let replayed = commit_service
        .commit_payment(order_id, "txn-commit-2", "paystack", dec!(50000), "NGN", 1)
        .await
        .unwrap();
    assert_eq!(replayed, CommitOutcome::AlreadyProcessed);
}

#[tokio::test]
#[ignore] // Requires test database
async fn mismatched_amount_is_rejected_without_committing() {
    let pool = create_test_pool().await;
    let order_id = seed_pending_order(&pool, "ORD-COMMIT-3", dec!(100000)).await;
    let (commit_service, order_repo, _receipt_repo, _job_broker) = service(pool.clone());

    let outcome = commit_service
        .commit_payment(order_id, "txn-commit-3", "paystack", dec!(99000), "NGN", 1)
        .await
        .unwrap();
    assert_eq!(outcome, CommitOutcome::AmountMismatch);

    let order = order_repo.find_by_id(order_id).await.unwrap().unwrap();
    assert!(!order.is_paid());
}

#[tokio::test]
#[ignore] // Requires test database
async fn payment_for_cancelled_order_requires_refund() {
    let pool = create_test_pool().await;
    let order_id = seed_pending_order(&pool, "ORD-COMMIT-4", dec!(75000)).await;
    sqlx::query("UPDATE orders SET status = 'cancelled' WHERE id = ?")
        .bind(order_id)
        .execute(&pool)
        .await
        .unwrap();
    let (commit_service, _order_repo, _receipt_repo, _job_broker) = service(pool.clone());

    let outcome = commit_service
        .commit_payment(order_id, "txn-commit-4", "paystack", dec!(75000), "NGN", 1)
        .await
        .unwrap();
    assert_eq!(outcome, CommitOutcome::RequiresRefund);
}

#[tokio::test]
#[ignore] // Requires test database
async fn unknown_order_is_reported_as_not_found() {
    let pool = create_test_pool().await;
    let (commit_service, _order_repo, _receipt_repo, _job_broker) = service(pool.clone());

    let outcome = commit_service
        .commit_payment(i64::MAX, "txn-commit-5", "paystack", dec!(1), "NGN", 1)
        .await
        .unwrap();
    assert_eq!(outcome, CommitOutcome::OrderNotFound);
}

#[tokio::test]
#[ignore] // Requires test database
async fn failed_payment_marks_the_order_failed_with_no_receipt() {
    let pool = create_test_pool().await;
    let order_id = seed_pending_order(&pool, "ORD-COMMIT-6", dec!(60000)).await;
    let (commit_service, order_repo, _receipt_repo, _job_broker) = service(pool.clone());

    commit_service
        .record_failed_payment(order_id, "txn-commit-6", "paystack", dec!(60000), "NGN", 1, "card_declined")
        .await
        .unwrap();

    let order = order_repo.find_by_id(order_id).await.unwrap().unwrap();
    assert!(!order.is_paid());
}
