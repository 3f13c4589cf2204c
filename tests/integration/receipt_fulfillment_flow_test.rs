// Receipt fulfillment pipeline integration tests (spec §4.3-§4.7).
//
// Drives `Receipt` through render -> upload -> email against a real
// MySQL test database. The render stage calls the real PDF renderer
// against a scratch directory (no network); the upload/email stages are
// exercised through the repository's narrow `update_*_stage` calls the
// workers themselves use, since Cloudinary/SMTP are out of reach in a
// test environment. `mark_completed`'s idempotent completion guard is
// the thing actually under test here.

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Utc;
use rust_decimal_macros::dec;

use helpers::test_database::create_test_pool;
use receiptor::modules::fulfillment::{mark_completed, render::render_receipt_pdf};
use receiptor::modules::receipts::models::{Receipt, ReceiptStatus};
use receiptor::modules::receipts::repositories::{MySqlReceiptRepository, ReceiptRepository};

async fn seed_receipt(pool: &sqlx::MySqlPool, receipt_number: &str) -> Receipt {
    let repo = MySqlReceiptRepository::new(pool.clone());
    let now = Utc::now();
    let receipt = Receipt {
        id: 0,
        receipt_number: receipt_number.to_string(),
        order_id: 1,
        transaction_id: 1,
        user_id: 7,
        store_id: 42,
        order_snapshot: serde_json::json!({"order_number": "ORD-1", "items": [{"sku": "A1", "qty": 1}]}),
        amount: dec!(125000),
        currency: "NGN".to_string(),
        status: ReceiptStatus::Pending,
        paid_at: now,
        pdf_generated: false,
        pdf_generated_at: None,
        pdf_local_path: None,
        pdf_size_bytes: None,
        pdf_generation_attempts: 0,
        cloudinary_uploaded: false,
        cloudinary_uploaded_at: None,
        cloudinary_public_id: None,
        cloudinary_secure_url: None,
        cloudinary_signed_url: None,
        cloudinary_signed_url_expires_at: None,
        cloudinary_upload_attempts: 0,
        email_sent: false,
        email_sent_at: None,
        email_send_attempts: 0,
        email_permanent_failure: false,
        email_last_error: None,
        email_recipient: "buyer@example.com".to_string(),
        created_at: now,
        updated_at: now,
    };
    repo.insert(&receipt).await.expect("failed to seed receipt")
}

#[tokio::test]
#[ignore] // Requires test database
async fn receipt_completes_only_after_all_three_stages_land() {
    let pool = create_test_pool().await;
    let repo = MySqlReceiptRepository::new(pool.clone());
    let receipt = seed_receipt(&pool, "RCP-2026-900001").await;
    let scratch_dir = std::env::temp_dir().join("receiptor-fulfillment-test");

    let (path, size_bytes) = render_receipt_pdf(&receipt, scratch_dir.to_str().unwrap())
        .expect("pdf render failed");
    repo.update_pdf_stage(receipt.id, &path.to_string_lossy(), size_bytes, 1)
        .await
        .unwrap();

    mark_completed(&repo, receipt.id).await.unwrap();
    let after_render = repo.find_by_id(receipt.id).await.unwrap().unwrap();
    assert!(after_render.pdf_generated);
    assert_ne!(after_render.status, ReceiptStatus::Completed);

    repo.update_cloudinary_stage(
        receipt.id,
        "rcp_900001",
        "https://res.cloudinary.com/demo/rcp_900001.pdf",
        "https://res.cloudinary.com/demo/rcp_900001.pdf?signed",
        Utc::now() + chrono::Duration::hours(1),
        1,
    )
    .await
    .unwrap();
    mark_completed(&repo, receipt.id).await.unwrap();
    let after_upload = repo.find_by_id(receipt.id).await.unwrap().unwrap();
    assert!(after_upload.cloudinary_uploaded);
    assert_ne!(after_upload.status, ReceiptStatus::Completed);

    repo.update_email_stage(receipt.id, 1).await.unwrap();
    mark_completed(&repo, receipt.id).await.unwrap();
    let completed = repo.find_by_id(receipt.id).await.unwrap().unwrap();
    assert!(completed.email_sent);
    assert_eq!(completed.status, ReceiptStatus::Completed);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
#[ignore] // Requires test database
async fn mark_completed_is_idempotent_once_settled() {
    let pool = create_test_pool().await;
    let repo = MySqlReceiptRepository::new(pool.clone());
    let receipt = seed_receipt(&pool, "RCP-2026-900002").await;

    repo.update_pdf_stage(receipt.id, "/tmp/unused.pdf", 10, 1).await.unwrap();
    repo.update_cloudinary_stage(
        receipt.id,
        "rcp_900002",
        "https://res.cloudinary.com/demo/rcp_900002.pdf",
        "https://res.cloudinary.com/demo/rcp_900002.pdf?signed",
        Utc::now() + chrono::Duration::hours(1),
        1,
    )
    .await
    .unwrap();
    repo.update_email_stage(receipt.id, 1).await.unwrap();

    mark_completed(&repo, receipt.id).await.unwrap();
    mark_completed(&repo, receipt.id).await.unwrap();

    let completed = repo.find_by_id(receipt.id).await.unwrap().unwrap();
    assert_eq!(completed.status, ReceiptStatus::Completed);
}

#[tokio::test]
#[ignore] // Requires test database
async fn permanent_email_failure_is_recorded_without_blocking_completion_state() {
    let pool = create_test_pool().await;
    let repo = MySqlReceiptRepository::new(pool.clone());
    let receipt = seed_receipt(&pool, "RCP-2026-900003").await;

    repo.record_email_failure(receipt.id, 1, true, "invalid recipient address")
        .await
        .unwrap();

    let reloaded = repo.find_by_id(receipt.id).await.unwrap().unwrap();
    assert!(reloaded.email_permanent_failure);
    assert!(!reloaded.email_sent);
    assert_eq!(reloaded.email_last_error.as_deref(), Some("invalid recipient address"));
}
