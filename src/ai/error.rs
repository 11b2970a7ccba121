//! Completion-service error handling.

use thiserror::Error;

/// Completion service specific errors.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// API key not found in environment or settings.
    #[error("API key not found. Set GITSCRIBE_API_KEY or OPENAI_API_KEY")]
    ApiKeyNotFound,

    /// Completion request failed with an error message.
    #[error("completion request failed: {0}")]
    RequestFailed(String),

    /// Invalid response format from the completion service.
    #[error("invalid response format from completion service: {0}")]
    InvalidResponseFormat(String),

    /// The service answered normally but produced no message text.
    ///
    /// Distinct from a transport failure; callers must treat the affected
    /// fragment as failed rather than silently skipping it.
    #[error("completion service returned no message text")]
    EmptyMessage,

    /// Rate limit exceeded, with server hints for when quota replenishes.
    #[error("rate limit exceeded (requests reset in {reset_requests_ms} ms, tokens reset in {reset_tokens_ms} ms)")]
    RateLimited {
        /// Milliseconds until the request quota replenishes.
        reset_requests_ms: u64,
        /// Milliseconds until the token quota replenishes.
        reset_tokens_ms: u64,
    },

    /// Rate limit retries exhausted without a successful response.
    #[error("rate limit still exceeded after {attempts} attempts")]
    RetriesExhausted {
        /// How many attempts were made in total.
        attempts: u32,
    },

    /// The assembled request cannot fit the model context window.
    #[error("request of {request_tokens} tokens plus {reserved_tokens} reserved completion tokens exceeds the {context_limit} token context window of {model}")]
    TooManyTokens {
        /// Estimated token count of the request messages.
        request_tokens: usize,
        /// Tokens reserved for the model's response.
        reserved_tokens: usize,
        /// Total context window of the model.
        context_limit: usize,
        /// Model identifier, for the error message.
        model: String,
    },

    /// Network connectivity error.
    #[error("network error: {0}")]
    NetworkError(String),
}
