use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::core::error::{AppError, AppResult};
use crate::modules::receipts::models::Receipt;

/// The buckets the upload worker classifies an SMTP failure into so
/// the caller can decide whether to retry (§4.5). `InvalidEmail` is
/// the only bucket that marks the receipt permanently failed without
/// consuming another retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailFailureKind {
    InvalidEmail,
    ServerError,
    RateLimit,
    AttachmentTooLarge,
    Unknown,
}

impl EmailFailureKind {
    pub fn is_permanent(self) -> bool {
        matches!(self, EmailFailureKind::InvalidEmail)
    }
}

pub struct EmailSendError {
    pub kind: EmailFailureKind,
    pub message: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_receipt(
        &self,
        receipt: &Receipt,
        pdf_bytes: Vec<u8>,
    ) -> Result<(), EmailSendError>;
}

pub struct LettreEmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl LettreEmailTransport {
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Configuration(format!("invalid SMTP host: {e}")))?
            .port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address: config.smtp_from_address.clone(),
        })
    }

    /// lettre's SMTP error exposes its cause mainly through `Display`;
    /// classify off the response text rather than a typed status code,
    /// since mailbox-unknown (550 5.1.1) and greylisting (450/421) both
    /// surface as plain server replies.
    fn classify(error: &lettre::transport::smtp::Error) -> EmailFailureKind {
        let message = error.to_string();
        if message.contains("550") || message.contains("5.1.1") || message.contains("no such user") {
            EmailFailureKind::InvalidEmail
        } else if message.contains("450") || message.contains("421") || message.contains("4.7.0") {
            EmailFailureKind::RateLimit
        } else if message.contains("connection") || message.contains("timed out") {
            EmailFailureKind::ServerError
        } else {
            EmailFailureKind::Unknown
        }
    }
}

#[async_trait]
impl EmailTransport for LettreEmailTransport {
    async fn send_receipt(
        &self,
        receipt: &Receipt,
        pdf_bytes: Vec<u8>,
    ) -> Result<(), EmailSendError> {
        const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
        if pdf_bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(EmailSendError {
                kind: EmailFailureKind::AttachmentTooLarge,
                message: format!("attachment is {} bytes, exceeds limit", pdf_bytes.len()),
            });
        }

        let attachment = Attachment::new(format!("{}.pdf", receipt.receipt_number))
            .body(pdf_bytes, ContentType::parse("application/pdf").unwrap());

        let body = MultiPart::mixed().singlepart(SinglePart::plain(format!(
            "Thanks for your purchase. Your receipt {} for {} {} is attached.",
            receipt.receipt_number, receipt.amount, receipt.currency
        )))
        .singlepart(attachment);

        let message = Message::builder()
            .from(self.from_address.parse().map_err(|e| EmailSendError {
                kind: EmailFailureKind::Unknown,
                message: format!("invalid from address: {e}"),
            })?)
            .to(receipt.email_recipient.parse().map_err(|_| EmailSendError {
                kind: EmailFailureKind::InvalidEmail,
                message: format!("invalid recipient address: {}", receipt.email_recipient),
            })?)
            .subject(format!("Your receipt {}", receipt.receipt_number))
            .multipart(body)
            .map_err(|e| EmailSendError {
                kind: EmailFailureKind::Unknown,
                message: format!("failed to build message: {e}"),
            })?;

        self.mailer.send(message).await.map_err(|e| EmailSendError {
            kind: Self::classify(&e),
            message: e.to_string(),
        })?;

        Ok(())
    }
}
