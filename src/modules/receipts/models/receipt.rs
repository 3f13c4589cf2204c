use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `Receipt.status = Completed ⇔ pdf_generated ∧ cloudinary_uploaded ∧
/// email_sent` (§3 invariant). The service only ever sets `Completed`
/// through `mark_completed` (§4.7); `Failed` is operator escalation, not
/// a path any worker takes automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Completed,
    Failed,
}

/// Created once, inside the payment-commit transaction, then mutated
/// exclusively by the three fulfillment workers — each owns its own
/// column group and nothing else writes them (§3 Ownership). Attempt
/// counters (`pdf_generation_attempts`, `cloudinary_upload_attempts`,
/// `email_send_attempts`) are monotonically non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Receipt {
    pub id: i64,
    pub receipt_number: String,
    pub order_id: i64,
    pub transaction_id: i64,
    pub user_id: i64,
    pub store_id: i64,
    pub order_snapshot: serde_json::Value,
    pub amount: Decimal,
    pub currency: String,
    pub status: ReceiptStatus,
    pub paid_at: DateTime<Utc>,

    pub pdf_generated: bool,
    pub pdf_generated_at: Option<DateTime<Utc>>,
    pub pdf_local_path: Option<String>,
    pub pdf_size_bytes: Option<i64>,
    pub pdf_generation_attempts: i32,

    pub cloudinary_uploaded: bool,
    pub cloudinary_uploaded_at: Option<DateTime<Utc>>,
    pub cloudinary_public_id: Option<String>,
    pub cloudinary_secure_url: Option<String>,
    pub cloudinary_signed_url: Option<String>,
    pub cloudinary_signed_url_expires_at: Option<DateTime<Utc>>,
    pub cloudinary_upload_attempts: i32,

    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub email_send_attempts: i32,
    pub email_permanent_failure: bool,
    pub email_last_error: Option<String>,
    pub email_recipient: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receipt {
    /// `Receipt.status = COMPLETED ⇔ pdfGenerated ∧ cloudinaryUploaded ∧ emailSent`.
    pub fn all_stages_complete(&self) -> bool {
        self.pdf_generated && self.cloudinary_uploaded && self.email_sent
    }

    pub fn is_completed(&self) -> bool {
        self.status == ReceiptStatus::Completed
    }

    /// `RCP-YYYY-NNNNNN` parses back to `(year, sequence)` per §8's round-trip property.
    pub fn parse_receipt_number(number: &str) -> Option<(i32, u64)> {
        let rest = number.strip_prefix("RCP-")?;
        let (year_str, seq_str) = rest.split_once('-')?;
        if seq_str.len() != 6 {
            return None;
        }
        let year = year_str.parse().ok()?;
        let sequence = seq_str.parse().ok()?;
        Some((year, sequence))
    }

    pub fn format_receipt_number(year: i32, sequence: u64) -> String {
        format!("RCP-{:04}-{:06}", year, sequence)
    }
}
