pub mod webhook_event;
pub mod webhook_log;

pub use webhook_event::{
    GenericEvent, MockEvent, NormalizedPayment, NormalizedStatus, PaystackEvent, PaystackEventData,
    PaystackMetadata, PaystackObject, WebhookEvent,
};
pub use webhook_log::{WebhookLog, WebhookOutcome};
