pub mod health_controller;
pub mod metrics;
