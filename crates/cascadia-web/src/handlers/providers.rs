//! Provider catalogue: pricing table plus what is actually wired up.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use cascadia_llm::pricing::{pricing_table, ProviderPricingView};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: BTreeMap<&'static str, ProviderPricingView>,
    /// Cascade order.
    pub active_providers: Vec<String>,
    pub active_models: BTreeMap<String, String>,
}

pub async fn providers(State(state): State<SharedState>) -> Json<ProvidersResponse> {
    let set = state.engine.providers();
    Json(ProvidersResponse {
        providers: pricing_table(),
        active_providers: set.iter().map(|p| p.name().to_string()).collect(),
        active_models: set
            .iter()
            .map(|p| (p.name().to_string(), p.model().to_string()))
            .collect(),
    })
}
