//! Prometheus text exposition for the `metrics` facade.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrometheusError {
    #[error("failed to install Prometheus recorder: {0}")]
    Install(#[from] BuildError),
}

/// Install the global Prometheus recorder and return a handle whose
/// `render()` output backs `/metrics/prometheus`.
///
/// Can only succeed once per process.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, PrometheusError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!("cascadia_requests_total", "Gateway requests by outcome");
    describe_counter!(
        "cascadia_provider_requests_total",
        "Requests answered per provider"
    );
    describe_histogram!(
        "cascadia_cascade_latency_ms",
        Unit::Milliseconds,
        "Wall-clock cascade latency"
    );

    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}
