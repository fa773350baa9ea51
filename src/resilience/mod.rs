//! Resilience layer for the bookwatch client.
//!
//! Only idempotent requests are retried. The poll loop does not use this
//! layer at all: its fixed period is its retry policy.

mod retry;

pub use retry::{RetryConfig, RetryPolicy};
