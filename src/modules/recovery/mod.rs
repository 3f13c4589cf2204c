pub mod controller;

pub use controller::{spawn_recovery_scheduler, RecoveryController, RecoverySweepReport};
