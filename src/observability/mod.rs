//! Observability module for the bookwatch client.
//!
//! Structured logging setup on top of `tracing-subscriber`, and request
//! metrics for the card service.

mod logging;
mod metrics;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use metrics::{DefaultMetricsCollector, MetricsCollector, RequestMetrics};
