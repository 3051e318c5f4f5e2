//! Anthropic Claude provider implementation.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS, error_message};
use crate::AiError;

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [AnthropicMessage<'a>; 1],
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

fn parse_response(body: &str) -> Result<String, AiError> {
    let response: AnthropicResponse = serde_json::from_str(body)?;

    let text = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        return Err(AiError::Provider {
            message: "Anthropic returned no text".to_string(),
        });
    }

    Ok(text)
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: [AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(AiError::Provider {
                message: error_message(status, &body),
            });
        }

        parse_response(&body)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
