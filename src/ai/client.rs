//! Completion dispatch with bounded retry under rate limiting.
//!
//! [`CompletionClient`] owns the single network relationship of the
//! crate: it validates request size before sending, optionally throttles
//! through a client-side [`RequestLimiter`], and retries rate-limited
//! requests using the server's reset hints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use crate::ai::error::CompletionError;
use crate::ai::limiter::RequestLimiter;
use crate::ai::{ClientMetadata, CompletionApi, CompletionRequest};
use crate::tokens::{self, TokenCounter};

/// Total attempts allowed for one request under rate limiting.
const MAX_ATTEMPTS: u32 = 10;

/// Completion client with retry and admission control.
pub struct CompletionClient {
    api: Box<dyn CompletionApi>,
    counter: Arc<dyn TokenCounter>,
    limiter: Option<RequestLimiter>,
}

impl CompletionClient {
    /// Creates a client around a completion service implementation.
    pub fn new(api: Box<dyn CompletionApi>, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            api,
            counter,
            limiter: None,
        }
    }

    /// Adds client-side request-rate admission control.
    ///
    /// Every attempt (including retries) first acquires one unit from the
    /// bucket, suspending the caller until a unit is available.
    #[must_use]
    pub fn with_limiter(mut self, limiter: RequestLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Returns metadata of the underlying service client.
    pub fn metadata(&self) -> ClientMetadata {
        self.api.metadata()
    }

    /// Sends one completion request, retrying on rate-limit responses.
    ///
    /// Rate-limited attempts sleep for the larger of the two server reset
    /// hints, up to [`MAX_ATTEMPTS`] attempts total. Any other failure
    /// propagates immediately without retry.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.check_request_size(request)?;

        let mut attempt = 1u32;
        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            match self.api.send(request).await {
                Ok(text) => return Ok(text),
                Err(CompletionError::RateLimited {
                    reset_requests_ms,
                    reset_tokens_ms,
                }) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(CompletionError::RetriesExhausted { attempts: attempt }.into());
                    }
                    let delay = Duration::from_millis(reset_requests_ms.max(reset_tokens_ms));
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limit exceeded, retrying after server hint"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Rejects requests that cannot fit the model context window.
    ///
    /// The decomposition layer keeps fragments under budget, so this only
    /// trips when the local counter and the service tokenizer disagree
    /// badly. Checked before any network traffic.
    fn check_request_size(&self, request: &CompletionRequest) -> Result<()> {
        let meta = self.api.metadata();
        let request_tokens = tokens::request_tokens(self.counter.as_ref(), &request.messages);

        if request_tokens + meta.max_completion_tokens > meta.context_limit {
            return Err(CompletionError::TooManyTokens {
                request_tokens,
                reserved_tokens: meta.max_completion_tokens,
                context_limit: meta.context_limit,
                model: meta.model,
            }
            .into());
        }

        debug!(
            request_tokens,
            context_limit = meta.context_limit,
            "request fits the context window"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::ai::test_utils::ScriptedApi;
    use crate::ai::ChatMessage;

    /// Exact counter: one token per byte, no framing surprises.
    struct ByteTokens;

    impl TokenCounter for ByteTokens {
        fn count(&self, text: &str) -> usize {
            text.len()
        }
    }

    fn make_request(content: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user(content)],
        }
    }

    fn rate_limited(reset_requests_ms: u64, reset_tokens_ms: u64) -> CompletionError {
        CompletionError::RateLimited {
            reset_requests_ms,
            reset_tokens_ms,
        }
    }

    #[tokio::test]
    async fn complete_returns_response_text() {
        let api = ScriptedApi::new(vec![Ok("feat: add parser".to_string())]);
        let client = CompletionClient::new(Box::new(api), Arc::new(ByteTokens));
        let text = client.complete(&make_request("diff")).await.unwrap();
        assert_eq!(text, "feat: add parser");
    }

    #[tokio::test(start_paused = true)]
    async fn complete_retries_rate_limits_with_hinted_delay() {
        let api = ScriptedApi::new(vec![
            Err(rate_limited(1000, 2000)),
            Err(rate_limited(3000, 500)),
            Ok("done".to_string()),
        ]);
        let calls = api.call_log();
        let client = CompletionClient::new(Box::new(api), Arc::new(ByteTokens));

        let start = Instant::now();
        let text = client.complete(&make_request("diff")).await.unwrap();

        assert_eq!(text, "done");
        assert_eq!(calls.count(), 3);
        // Each retry waits max(reset_requests, reset_tokens): 2000 + 3000.
        assert_eq!(start.elapsed(), Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn complete_gives_up_after_attempt_cap() {
        let responses = (0..MAX_ATTEMPTS).map(|_| Err(rate_limited(10, 10))).collect();
        let api = ScriptedApi::new(responses);
        let calls = api.call_log();
        let client = CompletionClient::new(Box::new(api), Arc::new(ByteTokens));

        let err = client.complete(&make_request("diff")).await.unwrap_err();
        let err = err.downcast::<CompletionError>().unwrap();
        assert!(matches!(
            err,
            CompletionError::RetriesExhausted {
                attempts: MAX_ATTEMPTS
            }
        ));
        assert_eq!(calls.count(), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn complete_does_not_retry_transport_errors() {
        let api = ScriptedApi::new(vec![
            Err(CompletionError::RequestFailed("HTTP 401: bad key".to_string())),
            Ok("never reached".to_string()),
        ]);
        let calls = api.call_log();
        let client = CompletionClient::new(Box::new(api), Arc::new(ByteTokens));

        let err = client.complete(&make_request("diff")).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert_eq!(calls.count(), 1);
    }

    #[tokio::test]
    async fn complete_propagates_empty_message() {
        let api = ScriptedApi::new(vec![Err(CompletionError::EmptyMessage)]);
        let client = CompletionClient::new(Box::new(api), Arc::new(ByteTokens));

        let err = client.complete(&make_request("diff")).await.unwrap_err();
        let err = err.downcast::<CompletionError>().unwrap();
        assert!(matches!(err, CompletionError::EmptyMessage));
    }

    #[tokio::test]
    async fn oversized_request_fails_before_any_call() {
        // Context 100, completion reserve 50: a 60-byte message cannot fit.
        let api = ScriptedApi::new(vec![Ok("unused".to_string())]).with_limits(100, 50);
        let calls = api.call_log();
        let client = CompletionClient::new(Box::new(api), Arc::new(ByteTokens));

        let err = client
            .complete(&make_request(&"x".repeat(60)))
            .await
            .unwrap_err();
        let err = err.downcast::<CompletionError>().unwrap();
        assert!(matches!(err, CompletionError::TooManyTokens { .. }));
        assert_eq!(calls.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_throttles_attempts() {
        // Two requests per minute: the second completion must wait ~30s.
        let api = ScriptedApi::new(vec![Ok("one".to_string()), Ok("two".to_string())]);
        let client = CompletionClient::new(Box::new(api), Arc::new(ByteTokens))
            .with_limiter(RequestLimiter::per_minute(2));

        let start = Instant::now();
        client.complete(&make_request("a")).await.unwrap();
        client.complete(&make_request("b")).await.unwrap();
        client.complete(&make_request("c")).await.unwrap_err(); // queue exhausted

        // The first two consume the full bucket; the third attempt waits
        // for one refill unit before the scripted queue reports empty.
        assert!(start.elapsed() >= Duration::from_secs(29));
    }
}
