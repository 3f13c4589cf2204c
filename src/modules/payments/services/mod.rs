pub mod payment_commit_service;

pub use payment_commit_service::{CommitOutcome, PaymentCommitService};
