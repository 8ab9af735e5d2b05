use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CompletionService;
use crate::config::Config;
use crate::error::CompletionError;

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Deserialize, Default)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url(), config.model())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "sending generateContent");

        let response = self.client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        extract_text(gemini_response)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GeminiResponse) -> Result<String, CompletionError> {
    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(CompletionError::EmptyResponse(block_reason));
    };

    let text: String = candidate
        .content
        .unwrap_or_default()
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(CompletionError::EmptyResponse(candidate.finish_reason.or(block_reason)));
    }

    Ok(text)
}

/// Map a non-2xx response to an error, recognising rejected API keys.
///
/// An invalid key comes back as 400 INVALID_ARGUMENT with "API key not
/// valid" in the message, so the message is checked as well as the status.
fn classify_error(status: u16, body: &str) -> CompletionError {
    let (message, api_status) = match serde_json::from_str::<GeminiErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };

    let rejected_key = status == 401
        || status == 403
        || api_status == "UNAUTHENTICATED"
        || api_status == "PERMISSION_DENIED"
        || message.contains("API key")
        || message.contains("API_KEY");

    if rejected_key {
        CompletionError::InvalidCredential(message)
    } else {
        CompletionError::Rejected { status, message }
    }
}
