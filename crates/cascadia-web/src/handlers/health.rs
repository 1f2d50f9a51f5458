//! Liveness and landing endpoints.

use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub timestamp: f64,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "cascadia",
        "version": env!("CARGO_PKG_VERSION"),
        "message": "LLM provider cascade gateway. POST /query with an X-API-Key header.",
        "endpoints": [
            "/health",
            "/query",
            "/metrics",
            "/metrics/prometheus",
            "/metrics/reset",
            "/providers",
            "/batch/resilience",
            "/batch/security",
        ],
    }))
}

/// `healthy` with the primary provider, or `degraded` when none is configured.
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let primary = state.engine.providers().primary();
    let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;

    Json(HealthResponse {
        status: if primary.is_some() { "healthy" } else { "degraded" },
        provider: primary.map(|p| p.name().to_string()),
        model: primary.map(|p| p.model().to_string()),
        timestamp,
    })
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
