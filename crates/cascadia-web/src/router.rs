//! Axum router: maps URL paths to handlers.

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use cascadia_security::API_KEY_HEADER;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    batch::{batch_resilience, batch_security},
    health::{health, not_found, root},
    metrics::{metrics_json, metrics_prometheus, metrics_reset},
    providers::providers,
    query::query,
};
use crate::middleware::{rate_limit, require_api_key};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);
    let shared: SharedState = Arc::new(state);

    // Layers run bottom-up: the key check happens before rate limiting.
    let query_routes = Router::new()
        .route("/query", post(query))
        .route_layer(from_fn_with_state(shared.clone(), rate_limit))
        .route_layer(from_fn_with_state(shared.clone(), require_api_key));

    let protected = Router::new()
        .route("/batch/resilience", post(batch_resilience))
        .route("/metrics/reset",    post(metrics_reset))
        .route_layer(from_fn_with_state(shared.clone(), require_api_key));

    Router::new()
        .route("/",                   get(root))
        .route("/health",             get(health))
        .route("/metrics",            get(metrics_json))
        .route("/metrics/prometheus", get(metrics_prometheus))
        .route("/providers",          get(providers))
        .route("/batch/security",     post(batch_security))
        .merge(query_routes)
        .merge(protected)
        .fallback(not_found)

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
}
