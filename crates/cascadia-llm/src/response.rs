//! Raw response shapes of the supported wire protocols.
//!
//! Only the fields the gateway reads are modelled; everything else in the
//! payload is ignored by serde.

use serde::Deserialize;

use crate::backend::AdapterFailure;

// ── OpenAI-compatible ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChatResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: Option<OpenAiMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiMessage {
    pub content: Option<String>,
}

// ── Gemini ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiPart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    pub block_reason: Option<String>,
}

// ── Anthropic ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub content: Vec<AnthropicBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

// ── Tagged union ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ProviderResponse {
    OpenAiChat(OpenAiChatResponse),
    Gemini(GeminiResponse),
    Anthropic(AnthropicResponse),
}

impl ProviderResponse {
    /// Extract the generated text. A missing or blank text field is a
    /// malformed response.
    pub fn into_text(self) -> Result<String, AdapterFailure> {
        let text = match self {
            ProviderResponse::OpenAiChat(r) => r
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .and_then(|m| m.content)
                .ok_or_else(|| missing("choices[0].message.content"))?,

            ProviderResponse::Gemini(r) => {
                if let Some(reason) = r.prompt_feedback.and_then(|f| f.block_reason) {
                    return Err(AdapterFailure::MalformedResponse(format!(
                        "prompt blocked by provider: {reason}"
                    )));
                }
                let candidate = r
                    .candidates
                    .into_iter()
                    .next()
                    .ok_or_else(|| missing("candidates[0]"))?;
                let parts = candidate
                    .content
                    .map(|c| c.parts)
                    .ok_or_else(|| missing("candidates[0].content"))?;
                let texts: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
                if texts.is_empty() {
                    return Err(missing("candidates[0].content.parts[].text"));
                }
                texts.concat()
            }

            ProviderResponse::Anthropic(r) => {
                let texts: Vec<String> = r
                    .content
                    .into_iter()
                    .filter(|b| b.kind == "text")
                    .filter_map(|b| b.text)
                    .collect();
                if texts.is_empty() {
                    return Err(missing("content[].text"));
                }
                texts.concat()
            }
        };

        if text.trim().is_empty() {
            return Err(AdapterFailure::MalformedResponse("provider returned empty text".into()));
        }
        Ok(text)
    }
}

fn missing(path: &str) -> AdapterFailure {
    AdapterFailure::MalformedResponse(format!("missing {path}"))
}
