//! Observability infrastructure - Metric descriptions for invalidation runs

mod metrics;

pub use metrics::describe_metrics;
