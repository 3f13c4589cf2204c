//! Receiptor Payment Webhook & Receipt Fulfillment Platform
//!
//! Ingests payment-provider webhooks, commits paid orders, and drives a
//! three-stage fulfillment pipeline (PDF render, cloud upload, email
//! delivery) to completion, recovering stuck work on a periodic sweep.

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

pub use modules::{fulfillment, health, payments, queue, receipts, recovery, webhooks};
