use serde::Serialize;
use thiserror::Error;

pub const MAX_PROMPT_CHARS: usize = 4_000;
pub const MAX_TOKENS_LIMIT: u32 = 2_048;
pub const MAX_TEMPERATURE: f32 = 2.0;

pub const DEFAULT_MAX_TOKENS: u32 = 256;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("prompt is {len} characters; the limit is {max}")]
    PromptTooLong { len: usize, max: usize },
    #[error("max_tokens must be between 1 and {max}, got {value}")]
    MaxTokensOutOfRange { value: u32, max: u32 },
    #[error("temperature must be between 0.0 and {max}, got {value}")]
    TemperatureOutOfRange { value: f32, max: f32 },
}

impl RequestError {
    /// Name of the offending request field.
    pub fn field(&self) -> &'static str {
        match self {
            RequestError::EmptyPrompt | RequestError::PromptTooLong { .. } => "prompt",
            RequestError::MaxTokensOutOfRange { .. } => "max_tokens",
            RequestError::TemperatureOutOfRange { .. } => "temperature",
        }
    }
}

/// One prompt plus generation parameters, validated on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeRequest {
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl CascadeRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Result<Self, RequestError> {
        let prompt = prompt.into();

        if prompt.trim().is_empty() {
            return Err(RequestError::EmptyPrompt);
        }
        let len = prompt.chars().count();
        if len > MAX_PROMPT_CHARS {
            return Err(RequestError::PromptTooLong { len, max: MAX_PROMPT_CHARS });
        }
        if !(1..=MAX_TOKENS_LIMIT).contains(&max_tokens) {
            return Err(RequestError::MaxTokensOutOfRange { value: max_tokens, max: MAX_TOKENS_LIMIT });
        }
        // NaN fails the range check too.
        if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(RequestError::TemperatureOutOfRange { value: temperature, max: MAX_TEMPERATURE });
        }

        Ok(Self { prompt, max_tokens, temperature })
    }

    /// Prompt with the HTTP surface defaults for the other parameters.
    pub fn with_defaults(prompt: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(prompt, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE)
    }

    pub fn prompt(&self) -> &str { &self.prompt }
    pub fn max_tokens(&self) -> u32 { self.max_tokens }
    pub fn temperature(&self) -> f32 { self.temperature }
}
