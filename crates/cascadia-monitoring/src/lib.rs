//! cascadia-monitoring: outcome metrics for the gateway.
//!
//! The cascade engine reports through the [`MetricsSink`] trait and never
//! touches a global. [`MetricsStore`] is the in-process implementation behind
//! the JSON `/metrics` route; it also forwards every event to the `metrics`
//! facade so an installed Prometheus recorder picks them up.

pub mod prometheus;
pub mod sink;
pub mod store;

pub use prometheus::{install_prometheus_recorder, PrometheusError};
pub use sink::{BlockedPrompt, CascadeOutcome, MetricsSink, NoopSink};
pub use store::{MetricsSnapshot, MetricsStore};
