pub mod broker;
pub mod models;
pub mod repository;

pub use broker::{
    backoff_delay_secs, JobBroker, QueueConfig, CLOUDINARY_UPLOAD, EMAIL_DELIVERY,
    RECEIPT_GENERATION, RECOVERY_SCAN,
};
pub use models::{JobLog, JobStatus};
pub use repository::{JobQueueRepository, MySqlJobQueueRepository};
