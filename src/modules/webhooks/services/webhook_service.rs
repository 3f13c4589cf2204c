use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::error::AppResult;
use crate::modules::payments::services::{CommitOutcome, PaymentCommitService};
use crate::modules::webhooks::models::{NormalizedStatus, WebhookEvent, WebhookLog, WebhookOutcome};
use crate::modules::webhooks::providers::WebhookProvider;
use crate::modules::webhooks::repositories::WebhookLogRepository;

/// The typed body every webhook response carries, success or not — the
/// endpoint itself always answers 200 unless something truly
/// unexpected happens (§4.1, §6).
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    fn ok(kind: &'static str) -> Self {
        Self {
            success: true,
            kind,
            message: None,
        }
    }

    fn rejected(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            kind,
            message: Some(message.into()),
        }
    }
}

pub struct WebhookService {
    providers: HashMap<String, Arc<dyn WebhookProvider>>,
    webhook_log_repo: Arc<dyn WebhookLogRepository>,
    commit_service: Arc<PaymentCommitService>,
    mock_enabled: bool,
}

impl WebhookService {
    pub fn new(
        providers: HashMap<String, Arc<dyn WebhookProvider>>,
        webhook_log_repo: Arc<dyn WebhookLogRepository>,
        commit_service: Arc<PaymentCommitService>,
        mock_enabled: bool,
    ) -> Self {
        Self {
            providers,
            webhook_log_repo,
            commit_service,
            mock_enabled,
        }
    }

    /// §4.1 end to end: resolve the provider, verify (or bypass) the
    /// signature, dedupe on `webhook_id`, parse and normalize the
    /// payload, then dispatch into the commit service. Every branch but
    /// a genuine repository failure returns `Ok`, because every other
    /// branch is a recognized, handled outcome rather than a system
    /// error.
    pub async fn handle(
        &self,
        provider_name: &str,
        webhook_id: Option<&str>,
        signature: Option<&str>,
        raw_payload: &[u8],
    ) -> AppResult<WebhookResponse> {
        let webhook_id = webhook_id
            .map(|s| s.to_string())
            .unwrap_or_else(Self::synthesize_webhook_id);

        let Some(provider) = self.resolve_provider(provider_name) else {
            warn!(provider = provider_name, "unknown webhook provider");
            return Ok(WebhookResponse::rejected(
                "validation_failed",
                format!("no handler registered for provider '{provider_name}'"),
            ));
        };

        if let Some(existing) = self.webhook_log_repo.find_by_webhook_id(&webhook_id).await? {
            info!(webhook_id, id = existing.id, "duplicate webhook delivery");
            return Ok(WebhookResponse::ok("duplicate"));
        }

        let signature_valid = if provider.allows_unsigned() && self.mock_enabled {
            true
        } else {
            match signature {
                Some(sig) => provider.verify_signature(raw_payload, sig),
                None => false,
            }
        };

        let raw_json: serde_json::Value =
            serde_json::from_slice(raw_payload).unwrap_or(serde_json::Value::Null);

        let log = WebhookLog::new(
            webhook_id.clone(),
            provider.name(),
            "unknown",
            raw_json,
            signature.map(|s| s.to_string()),
            signature_valid,
        );
        let log = self.webhook_log_repo.insert(&log).await?;

        if !signature_valid {
            warn!(webhook_id, provider = provider.name(), "signature verification failed");
            self.webhook_log_repo
                .mark_outcome(log.id, WebhookOutcome::ValidationFailed, Some("invalid signature"), None, None)
                .await?;
            return Ok(WebhookResponse::rejected("invalid_signature", "invalid signature"));
        }

        let event = match provider.parse(raw_payload) {
            Ok(event) => event,
            Err(e) => {
                error!(webhook_id, error = %e, "failed to parse webhook payload");
                self.webhook_log_repo
                    .mark_outcome(log.id, WebhookOutcome::ProcessingFailed, Some(&e.to_string()), None, None)
                    .await?;
                return Ok(WebhookResponse::rejected("validation_failed", e.to_string()));
            }
        };

        self.dispatch(log, event).await
    }

    async fn dispatch(&self, log: WebhookLog, event: WebhookEvent) -> AppResult<WebhookResponse> {
        let Some(normalized) = event.normalize() else {
            info!(webhook_id = %log.webhook_id, event_type = event.event_type(), "ignoring unrecognized event type");
            self.webhook_log_repo
                .mark_outcome(log.id, WebhookOutcome::Ignored, None, None, None)
                .await?;
            return Ok(WebhookResponse::ok("ignored"));
        };

        match normalized.status {
            NormalizedStatus::Succeeded => {
                let outcome = self
                    .commit_service
                    .commit_payment(
                        normalized.order_id,
                        &normalized.transaction_id,
                        &log.provider,
                        normalized.amount,
                        &normalized.currency,
                        log.id,
                    )
                    .await;

                match outcome {
                    Ok(CommitOutcome::Committed { receipt_id }) => {
                        self.webhook_log_repo
                            .mark_outcome(
                                log.id,
                                WebhookOutcome::Success,
                                None,
                                Some(normalized.order_id),
                                Some(receipt_id),
                            )
                            .await?;
                        Ok(WebhookResponse::ok("processed"))
                    }
                    Ok(CommitOutcome::AlreadyProcessed) => {
                        self.webhook_log_repo
                            .mark_outcome(log.id, WebhookOutcome::Duplicate, None, Some(normalized.order_id), None)
                            .await?;
                        Ok(WebhookResponse::ok("already_processed"))
                    }
                    Ok(CommitOutcome::RequiresRefund) => {
                        self.webhook_log_repo
                            .mark_outcome(
                                log.id,
                                WebhookOutcome::ProcessingFailed,
                                Some("payment for cancelled order requires refund"),
                                Some(normalized.order_id),
                                None,
                            )
                            .await?;
                        Ok(WebhookResponse::rejected("validation_failed", "order was cancelled"))
                    }
                    Ok(CommitOutcome::AmountMismatch) => {
                        self.webhook_log_repo
                            .mark_outcome(
                                log.id,
                                WebhookOutcome::ProcessingFailed,
                                Some("amount mismatch"),
                                Some(normalized.order_id),
                                None,
                            )
                            .await?;
                        Ok(WebhookResponse::rejected("validation_failed", "payment amount does not match order total"))
                    }
                    Ok(CommitOutcome::OrderNotFound) => {
                        self.webhook_log_repo
                            .mark_outcome(
                                log.id,
                                WebhookOutcome::ProcessingFailed,
                                Some("order not found"),
                                None,
                                None,
                            )
                            .await?;
                        Ok(WebhookResponse::rejected("validation_failed", "order not found"))
                    }
                    Err(e) => {
                        self.webhook_log_repo.increment_processing_attempts(log.id).await?;
                        self.webhook_log_repo
                            .mark_outcome(log.id, WebhookOutcome::ProcessingFailed, Some(&e.to_string()), None, None)
                            .await?;
                        Err(e)
                    }
                }
            }
            NormalizedStatus::Failed => {
                self.commit_service
                    .record_failed_payment(
                        normalized.order_id,
                        &normalized.transaction_id,
                        &log.provider,
                        normalized.amount,
                        &normalized.currency,
                        log.id,
                        "payment failed at provider",
                    )
                    .await?;
                self.webhook_log_repo
                    .mark_outcome(log.id, WebhookOutcome::Success, None, Some(normalized.order_id), None)
                    .await?;
                Ok(WebhookResponse::ok("payment_failed"))
            }
        }
    }

    fn resolve_provider(&self, provider_name: &str) -> Option<Arc<dyn WebhookProvider>> {
        if let Some(provider) = self.providers.get(provider_name) {
            return Some(provider.clone());
        }
        self.providers.get("generic").cloned()
    }

    fn synthesize_webhook_id() -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("webhook_{}_{}", chrono::Utc::now().timestamp_millis(), &suffix[..12])
    }
}
