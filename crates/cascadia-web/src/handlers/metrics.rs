//! Metrics endpoints: JSON snapshot, reset and Prometheus exposition.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use cascadia_monitoring::MetricsSnapshot;

use crate::error::ApiError;
use crate::state::SharedState;

pub async fn metrics_json(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Zero the in-process counters. Prometheus counters are monotonic and
/// are left alone.
pub async fn metrics_reset(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    state.metrics.reset();
    Json(state.metrics.snapshot())
}

pub async fn metrics_prometheus(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .prometheus
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Prometheus exporter is not enabled".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
