//! Google Gemini provider implementation.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, error_message};
use crate::AiError;

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
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
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

/// Concatenates the text parts of the first candidate.
fn parse_response(body: &str) -> Result<String, AiError> {
    let response: GeminiResponse = serde_json::from_str(body)?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::Provider {
            message: "Gemini returned no text".to_string(),
        });
    }

    Ok(text)
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = GeminiRequest {
            contents: [GeminiContent {
                role: "user",
                parts: [GeminiPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(format!("{API_BASE}/{}:generateContent", self.model))
            .header("x-goog-api-key", &self.api_key)
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
        "gemini"
    }
}
