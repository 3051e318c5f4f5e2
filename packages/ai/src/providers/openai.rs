//! `OpenAI` GPT provider implementation.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS, error_message};
use crate::AiError;

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: [OpenAiMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

fn parse_response(body: &str) -> Result<String, AiError> {
    let response: OpenAiResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    choice
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AiError::Provider {
            message: "OpenAI returned no text".to_string(),
        })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: [OpenAiMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
        };

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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
        "openai"
    }
}
