//! Mapping from domain errors to HTTP responses. Every error body is
//! `{"detail": "..."}`.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cascadia_config::RateLimit;
use cascadia_llm::{CascadeError, RequestError, ALL_PROVIDERS_FAILED};
use cascadia_security::{AuthError, BlockReport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Rate limit exceeded: {limit}")]
    RateLimited { limit: RateLimit, retry_after: Duration },

    #[error("Invalid {field}: {0}", field = .0.field())]
    Validation(#[from] RequestError),

    #[error("Security Alert: {}.", .0.reasons().join("; "))]
    Blocked(BlockReport),

    /// Only the generic message reaches the client; per-provider detail
    /// stays in the logs.
    #[error("{0}")]
    CascadeFailed(String),

    #[error("No LLM providers are configured")]
    NoProviders,

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::Misconfigured) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(AuthError::Invalid) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Blocked(_) => StatusCode::BAD_REQUEST,
            ApiError::CascadeFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NoProviders => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<CascadeError> for ApiError {
    fn from(err: CascadeError) -> Self {
        match err {
            CascadeError::NoProviders => ApiError::NoProviders,
            CascadeError::Cancelled { .. } => ApiError::CascadeFailed(ALL_PROVIDERS_FAILED.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        let mut response = (status, body).into_response();

        if let ApiError::RateLimited { retry_after, .. } = &self {
            // Whole seconds, rounded up, never zero.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let invalid = ApiError::Validation(RequestError::EmptyPrompt);
        assert_eq!(ApiError::Auth(AuthError::Invalid).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Auth(AuthError::Misconfigured).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::NoProviders.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::from(CascadeError::NoProviders).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_validation_detail_names_the_field() {
        let err = ApiError::from(RequestError::MaxTokensOutOfRange { value: 0, max: 2048 });
        assert_eq!(err.to_string(), "Invalid max_tokens: max_tokens must be between 1 and 2048, got 0");
        let err = ApiError::from(RequestError::EmptyPrompt);
        assert_eq!(err.to_string(), "Invalid prompt: prompt must not be empty");
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let err = ApiError::RateLimited {
            limit: RateLimit::per_minute(10),
            retry_after: Duration::from_millis(5_200),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "6");
    }
}
