//! OpenAI-compatible chat-completion API client.

use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ChatMessage, ClientMetadata, CompletionApi, CompletionRequest};
use crate::ai::error::CompletionError;
use crate::config::Config;

/// Header carrying the time until the request quota replenishes.
const RESET_REQUESTS_HEADER: &str = "x-ratelimit-reset-requests";

/// Header carrying the time until the token quota replenishes.
const RESET_TOKENS_HEADER: &str = "x-ratelimit-reset-tokens";

/// Fallback reset delay when a rate-limited response omits a hint header.
const DEFAULT_RESET_MS: u64 = 1000;

/// Sampling temperature for commit message generation.
///
/// Zero temperature with a low top_p keeps messages deterministic across
/// retries of the same fragment.
const TEMPERATURE: f32 = 0.0;
const TOP_P: f32 = 0.1;

/// OpenAI API request body.
#[derive(Serialize, Debug)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: i32,
    stream: bool,
}

/// OpenAI API response choice.
#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

/// OpenAI API response message.
#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI API response.
#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

/// OpenAI-compatible API client (works with OpenAI and API-compatible
/// gateways).
pub struct OpenAiApi {
    /// HTTP client for API requests.
    client: Client,
    /// API key for bearer authentication.
    api_key: String,
    /// Model identifier.
    model: String,
    /// Base URL for the API (e.g., "https://api.openai.com").
    base_url: String,
    /// Total context window of the model, in tokens.
    context_limit: usize,
    /// Maximum tokens requested for the completion.
    max_completion_tokens: usize,
}

impl OpenAiApi {
    /// Creates a new OpenAI-compatible API client.
    pub fn new(
        model: String,
        api_key: String,
        base_url: String,
        context_limit: usize,
        max_completion_tokens: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(super::REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            context_limit,
            max_completion_tokens,
        })
    }

    /// Creates a client from the run configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.model.clone(),
            config.api_key.clone(),
            config.api_base.clone(),
            config.context_limit,
            config.max_completion_tokens,
        )
    }

    /// Builds the full API URL.
    fn api_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1/chat/completions")
    }
}

/// Reads one reset-hint header, normalized to milliseconds.
fn reset_hint_ms(headers: &HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map_or(DEFAULT_RESET_MS, parse_reset_hint)
}

/// Parses a reset hint like `"20s"`, `"150ms"` or `"6m5s"`.
///
/// Takes the first integer in the value; the unit is seconds unless the
/// value ends in `ms`.
fn parse_reset_hint(raw: &str) -> u64 {
    let value = Regex::new(r"\d+")
        .ok()
        .and_then(|re| re.find(raw).map(|m| m.as_str().to_string()))
        .and_then(|digits| digits.parse::<u64>().ok());

    match value {
        Some(n) if raw.ends_with("ms") => n,
        Some(n) => n * 1000,
        None => DEFAULT_RESET_MS,
    }
}

impl CompletionApi for OpenAiApi {
    fn send<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>> {
        Box::pin(async move {
            let body = OpenAiRequest {
                model: &self.model,
                messages: &request.messages,
                temperature: TEMPERATURE,
                top_p: TOP_P,
                max_tokens: self.max_completion_tokens as i32,
                stream: false,
            };

            let api_url = self.api_url();
            info!(url = %api_url, model = %self.model, message_count = request.messages.len(), "Sending completion request");

            let response = self
                .client
                .post(&api_url)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
                .map_err(|e| CompletionError::NetworkError(e.to_string()))?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let headers = response.headers();
                return Err(CompletionError::RateLimited {
                    reset_requests_ms: reset_hint_ms(headers, RESET_REQUESTS_HEADER),
                    reset_tokens_ms: reset_hint_ms(headers, RESET_TOKENS_HEADER),
                });
            }

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(CompletionError::RequestFailed(format!(
                    "HTTP {status}: {error_text}"
                )));
            }

            let openai_response: OpenAiResponse = response
                .json()
                .await
                .map_err(|e| CompletionError::InvalidResponseFormat(e.to_string()))?;

            debug!(
                choice_count = openai_response.choices.len(),
                "Received completion response"
            );

            openai_response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|text| !text.trim().is_empty())
                .ok_or(CompletionError::EmptyMessage)
        })
    }

    fn metadata(&self) -> ClientMetadata {
        ClientMetadata {
            provider: "OpenAI".to_string(),
            model: self.model.clone(),
            context_limit: self.context_limit,
            max_completion_tokens: self.max_completion_tokens,
        }
    }
}
