//! Request guards for protected routes.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use cascadia_security::API_KEY_HEADER;

use crate::error::ApiError;
use crate::rate_limit::RateDecision;
use crate::state::SharedState;

/// Reject requests without the shared `X-API-Key` secret.
pub async fn require_api_key(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    state.api_key.check(provided)?;
    Ok(next.run(request).await)
}

/// Token bucket per client address.
pub async fn rate_limit(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    match state.rate_limiter.check(&client).await {
        RateDecision::Allowed => Ok(next.run(request).await),
        RateDecision::Limited { retry_after } => {
            tracing::warn!(client = %client, retry_after_ms = retry_after.as_millis() as u64, "Rate limit exceeded");
            Err(ApiError::RateLimited { limit: state.rate_limiter.limit(), retry_after })
        }
    }
}

/// Peer address when the server was started with connect info, otherwise
/// the first `X-Forwarded-For` hop.
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
