pub mod job_log;

pub use job_log::{JobLog, JobStatus};
