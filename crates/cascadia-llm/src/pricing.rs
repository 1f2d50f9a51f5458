//! Per-model pricing and performance table, and rough cost estimates.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPricing {
    pub price_per_1m_input: f64,
    pub price_per_1m_output: f64,
    pub avg_latency_ms: u32,
    pub context_window: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderPricing {
    pub provider: &'static str,
    pub display_name: &'static str,
    pub models: &'static [(&'static str, ModelPricing)],
}

const fn price(input: f64, output: f64, avg_latency_ms: u32, context_window: u32) -> ModelPricing {
    ModelPricing {
        price_per_1m_input: input,
        price_per_1m_output: output,
        avg_latency_ms,
        context_window,
    }
}

pub const PRICING: &[ProviderPricing] = &[
    ProviderPricing {
        provider: "gemini",
        display_name: "Google Gemini",
        models: &[
            ("gemini-2.0-flash-exp", price(0.075, 0.30, 120, 1_048_576)),
            ("gemini-1.5-pro", price(1.25, 5.00, 150, 2_097_152)),
            ("gemini-1.0-pro", price(0.50, 1.50, 130, 32_760)),
        ],
    },
    ProviderPricing {
        provider: "groq",
        display_name: "Groq",
        models: &[
            ("llama-3.3-70b-versatile", price(0.59, 0.79, 87, 128_000)),
            ("llama3-70b", price(0.59, 0.79, 90, 8_192)),
            ("mixtral-8x7b", price(0.24, 0.24, 95, 32_768)),
        ],
    },
    ProviderPricing {
        provider: "openrouter",
        display_name: "OpenRouter",
        models: &[
            ("google/gemini-2.0-flash-exp:free", price(0.0, 0.0, 200, 1_048_576)),
            ("gpt-4", price(30.0, 60.0, 250, 128_000)),
            ("gpt-3.5-turbo", price(0.50, 1.50, 180, 16_385)),
            ("claude-3-opus", price(15.0, 75.0, 300, 200_000)),
        ],
    },
    ProviderPricing {
        provider: "anthropic",
        display_name: "Anthropic",
        models: &[
            ("claude-3-5-haiku-latest", price(0.80, 4.00, 180, 200_000)),
        ],
    },
];

pub fn model_pricing(provider: &str, model: &str) -> Option<&'static ModelPricing> {
    PRICING
        .iter()
        .find(|p| p.provider == provider)?
        .models
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, pricing)| pricing)
}

/// Cost in USD rounded to six decimals; `None` for an unpriced model.
pub fn estimate_cost(provider: &str, model: &str, input_tokens: u64, output_tokens: u64) -> Option<f64> {
    let p = model_pricing(provider, model)?;
    let cost = (input_tokens as f64 / 1_000_000.0) * p.price_per_1m_input
        + (output_tokens as f64 / 1_000_000.0) * p.price_per_1m_output;
    Some((cost * 1_000_000.0).round() / 1_000_000.0)
}

/// Estimate from the prompt alone: two tokens per word in, half of
/// `max_tokens` out.
pub fn estimate_for_prompt(provider: &str, model: &str, prompt: &str, max_tokens: u32) -> Option<f64> {
    let input_tokens = prompt.split_whitespace().count() as u64 * 2;
    let output_tokens = u64::from(max_tokens / 2);
    estimate_cost(provider, model, input_tokens, output_tokens)
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderPricingView {
    pub name: &'static str,
    pub models: BTreeMap<&'static str, ModelPricing>,
}

/// Serializable form of the whole table, keyed by provider.
pub fn pricing_table() -> BTreeMap<&'static str, ProviderPricingView> {
    PRICING
        .iter()
        .map(|p| {
            (
                p.provider,
                ProviderPricingView {
                    name: p.display_name,
                    models: p.models.iter().copied().collect(),
                },
            )
        })
        .collect()
}
