//! OpenAI Responses API client (https://api.openai.com/v1 by default).
//!
//! [`OpenAiClient::generate`] never fails: every error is mapped to a short advisory string
//! that can be delivered to the user as a normal reply.

use crate::config::GenerativeConfig;
use serde::Serialize;
use std::time::Duration;

/// Reply used when no api key is configured. No request is made.
pub const DISABLED_REPLY: &str =
    "AI is currently disabled. I'm running in template mode. Try /anime /gaming /psychology /strategy.";
pub const RATE_LIMITED_REPLY: &str = "I'm rate-limited right now. Try again in 30-60 seconds.";
pub const API_ERROR_REPLY: &str = "AI is unavailable right now. Try again later.";
pub const MALFORMED_REPLY: &str = "I'm online, but I hit a formatting snag. Try again.";
pub const REQUEST_FAILED_REPLY: &str = "AI is temporarily unavailable. Try again later.";

/// Upstream bodies are cut to this many chars in log lines.
const LOG_BODY_LIMIT: usize = 300;

#[derive(Debug, thiserror::Error)]
pub enum GenerativeError {
    #[error("generative backend not configured")]
    Disabled,
    #[error("generative backend rate limited")]
    RateLimited,
    #[error("generative api error: {status}")]
    Api { status: u16 },
    #[error("generative request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generative response was not json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("generative response had no text output")]
    Malformed,
}

impl GenerativeError {
    /// User-facing text for this failure.
    pub fn advisory(&self) -> &'static str {
        match self {
            GenerativeError::Disabled => DISABLED_REPLY,
            GenerativeError::RateLimited => RATE_LIMITED_REPLY,
            GenerativeError::Api { .. } => API_ERROR_REPLY,
            GenerativeError::Request(_) | GenerativeError::Decode(_) => REQUEST_FAILED_REPLY,
            GenerativeError::Malformed => MALFORMED_REPLY,
        }
    }
}

/// Client for the Responses API. Cheap to clone.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// `api_key` is the resolved credential (env or config); `None` makes every call return
    /// [`DISABLED_REPLY`] without touching the network.
    pub fn new(config: &GenerativeConfig, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.effective_timeout_secs()))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("generative: falling back to default http client: {}", e);
                reqwest::Client::new()
            });
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text for `prompt` with the given style instruction. Always returns displayable text.
    pub async fn generate(&self, instructions: &str, prompt: &str) -> String {
        match self.try_generate(instructions, prompt).await {
            Ok(text) => text,
            Err(e) => {
                if !matches!(e, GenerativeError::Disabled) {
                    log::warn!("generative: {}", e);
                }
                e.advisory().to_string()
            }
        }
    }

    /// POST /responses — single attempt, no retry.
    pub async fn try_generate(
        &self,
        instructions: &str,
        prompt: &str,
    ) -> Result<String, GenerativeError> {
        let api_key = self.api_key.as_ref().ok_or(GenerativeError::Disabled)?;
        let url = format!("{}/responses", self.base_url);
        let body = ResponsesRequest {
            model: &self.model,
            instructions,
            input: prompt,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            log::warn!("generative rate limited (429): {}", truncate(&body, LOG_BODY_LIMIT));
            return Err(GenerativeError::RateLimited);
        }
        if status.is_client_error() || status.is_server_error() {
            let body = res.text().await.unwrap_or_default();
            log::warn!(
                "generative api error {}: {}",
                status,
                truncate(&body, LOG_BODY_LIMIT)
            );
            return Err(GenerativeError::Api {
                status: status.as_u16(),
            });
        }
        let bytes = res.bytes().await?;
        let data: serde_json::Value = serde_json::from_slice(&bytes)?;
        first_text(&data)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(GenerativeError::Malformed)
    }
}

/// Cut `s` to at most `limit` chars on a char boundary.
pub(crate) fn truncate(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
}

/// First text segment across `output[*].content[*].text` (reasoning items carry no text
/// content). Items of an unexpected shape are skipped.
fn first_text(data: &serde_json::Value) -> Option<&str> {
    data.get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(|c| c.as_array()))
        .flatten()
        .find_map(|part| part.get("text").and_then(|t| t.as_str()))
}
