//! `POST /query`: validate, screen, then run the cascade.

use axum::extract::State;
use axum::Json;
use cascadia_llm::pricing::estimate_for_prompt;
use cascadia_llm::request::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use cascadia_llm::{CascadeRequest, ALL_PROVIDERS_FAILED};
use cascadia_security::ScreenVerdict;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::{cascade_path, record_block, CascadeStep};
use crate::state::SharedState;

fn default_max_tokens() -> u32 { DEFAULT_MAX_TOKENS }
fn default_temperature() -> f32 { DEFAULT_TEMPERATURE }

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub request_id: Uuid,
    pub response: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
    pub status: &'static str,
    pub error: Option<String>,
    pub cascade_path: Vec<CascadeStep>,
    pub cost_estimate_usd: Option<f64>,
}

pub async fn query(
    State(state): State<SharedState>,
    Json(body): Json<QueryBody>,
) -> Result<Json<QueryResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let request = CascadeRequest::new(body.prompt, body.max_tokens, body.temperature)?;

    if let ScreenVerdict::Blocked(report) = state.screen.screen(request.prompt()) {
        record_block(&state, &report);
        return Err(ApiError::Blocked(report));
    }

    let result = state.engine.run(&request).await?;

    let (Some(text), Some(provider), Some(model)) =
        (result.response_text(), result.provider_used(), result.model_used())
    else {
        for attempt in result.attempts() {
            tracing::warn!(
                %request_id,
                provider = attempt.provider_name(),
                outcome = ?attempt.outcome(),
                reason = attempt.error_detail().unwrap_or_default(),
                "Cascade step failed",
            );
        }
        return Err(ApiError::CascadeFailed(ALL_PROVIDERS_FAILED.to_string()));
    };

    let cost_estimate_usd =
        estimate_for_prompt(provider, model, request.prompt(), request.max_tokens());
    tracing::info!(%request_id, provider, latency_ms = result.total_latency_ms(), "Query served");

    Ok(Json(QueryResponse {
        request_id,
        response: text.to_string(),
        provider: provider.to_string(),
        model: model.to_string(),
        latency_ms: result.total_latency_ms(),
        status: "success",
        error: None,
        cascade_path: cascade_path(result.attempts()),
        cost_estimate_usd,
    }))
}
