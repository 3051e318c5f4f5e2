//! LLM provider abstraction and implementations.
//!
//! Supports Google Gemini, Anthropic Claude, and `OpenAI` via a common
//! single-turn completion trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::AiError;

/// Maximum tokens requested from providers that require a limit.
pub const MAX_TOKENS: u32 = 4096;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a single user prompt and returns the model's text reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider returns no
    /// text.
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `GEMINI_API_KEY` set -> Google Gemini
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 3. `OPENAI_API_KEY` set -> `OpenAI`
///
/// `AI_MODEL` overrides the provider's default model.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = match std::env::var("AI_PROVIDER") {
        Ok(provider) => provider,
        Err(_) => detect_provider().ok_or_else(|| AiError::Config {
            message: "No AI credentials found. Set GEMINI_API_KEY, ANTHROPIC_API_KEY or \
                      OPENAI_API_KEY, or set AI_PROVIDER explicitly."
                .to_string(),
        })?,
    };

    let model = std::env::var("AI_MODEL").ok();

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = require_key("GEMINI_API_KEY")?;
            let model = model.unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
            Ok(Box::new(gemini::GeminiProvider::new(api_key, model)))
        }
        "anthropic" | "claude" => {
            let api_key = require_key("ANTHROPIC_API_KEY")?;
            let model = model.unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        "openai" | "gpt" => {
            let api_key = require_key("OPENAI_API_KEY")?;
            let model = model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            Ok(Box::new(openai::OpenAiProvider::new(api_key, model)))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'gemini', 'anthropic', or 'openai'."),
        }),
    }
}

fn require_key(var: &str) -> Result<String, AiError> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| AiError::Config {
            message: format!("{var} environment variable not set"),
        })
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name that matches the arms in
/// [`create_provider_from_env`], or `None` when no key is set.
fn detect_provider() -> Option<String> {
    [
        ("GEMINI_API_KEY", "gemini"),
        ("ANTHROPIC_API_KEY", "anthropic"),
        ("OPENAI_API_KEY", "openai"),
    ]
    .into_iter()
    .find(|(var, _)| std::env::var(var).is_ok_and(|key| !key.trim().is_empty()))
    .map(|(var, provider)| {
        log::info!("Auto-detected AI provider: {provider} ({var} found)");
        provider.to_string()
    })
}

/// Formats a non-success provider response, preferring the provider's
/// own `error.message` field.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| format!("HTTP {status}: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_provider_message() {
        let body = r#"{"error": {"message": "quota exceeded", "code": 429}}"#;
        assert_eq!(
            error_message(reqwest::StatusCode::TOO_MANY_REQUESTS, body),
            "quota exceeded"
        );
    }

    #[test]
    fn error_message_falls_back_to_status_and_body() {
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down"),
            "HTTP 502 Bad Gateway: upstream down"
        );
    }
}
