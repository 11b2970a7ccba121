//! Shared test utilities for the `ai` module.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ai::error::CompletionError;
use crate::ai::{ClientMetadata, CompletionApi, CompletionRequest};

/// Scripted completion API with a pre-programmed queue of responses.
///
/// Responses are consumed in call order. When the queue is exhausted,
/// subsequent calls return a `RequestFailed` error. Every call records
/// the final user-message content so tests can assert which payloads
/// were dispatched and in what order; use [`call_log`](Self::call_log)
/// to obtain a shared handle before the client is moved into a
/// [`CompletionClient`](super::client::CompletionClient).
///
/// A response entry may carry a delay, which elapses (in tokio time)
/// before the result is returned. Delays let tests force completions to
/// finish out of dispatch order.
pub(crate) struct ScriptedApi {
    responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    calls: Arc<Mutex<Vec<String>>>,
    metadata: ClientMetadata,
}

struct ScriptedResponse {
    delay: Option<Duration>,
    result: Result<String, CompletionError>,
}

impl ScriptedApi {
    /// Creates a scripted API returning the given results in call order.
    pub(crate) fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        let scripted = responses
            .into_iter()
            .map(|result| ScriptedResponse {
                delay: None,
                result,
            })
            .collect();
        Self {
            responses: Arc::new(Mutex::new(scripted)),
            calls: Arc::new(Mutex::new(Vec::new())),
            metadata: ClientMetadata {
                provider: "Scripted".to_string(),
                model: "scripted-model".to_string(),
                context_limit: 200_000,
                max_completion_tokens: 500,
            },
        }
    }

    /// Creates a scripted API whose n-th response resolves after the n-th
    /// delay.
    pub(crate) fn with_delays(
        responses: Vec<(Duration, Result<String, CompletionError>)>,
    ) -> Self {
        let api = Self::new(Vec::new());
        {
            #[allow(clippy::unwrap_used)]
            let mut queue = api.responses.lock().unwrap();
            for (delay, result) in responses {
                queue.push_back(ScriptedResponse {
                    delay: Some(delay),
                    result,
                });
            }
        }
        api
    }

    /// Overrides the advertised context window and completion reserve.
    pub(crate) fn with_limits(mut self, context_limit: usize, max_completion_tokens: usize) -> Self {
        self.metadata.context_limit = context_limit;
        self.metadata.max_completion_tokens = max_completion_tokens;
        self
    }

    /// Returns a handle for inspecting dispatched payloads after the API
    /// has been moved into a client.
    pub(crate) fn call_log(&self) -> CallLogHandle {
        CallLogHandle {
            calls: self.calls.clone(),
        }
    }
}

/// Shared handle to a scripted API's dispatched payload log.
pub(crate) struct CallLogHandle {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLogHandle {
    /// Returns the final user-message content of every dispatched request.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn payloads(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns how many requests were dispatched.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CompletionApi for ScriptedApi {
    fn send<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>> {
        let responses = self.responses.clone();
        let calls = self.calls.clone();
        let payload = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Box::pin(async move {
            #[allow(clippy::unwrap_used)]
            let next = {
                calls.lock().unwrap().push(payload);
                responses.lock().unwrap().pop_front()
            };
            match next {
                Some(ScriptedResponse { delay, result }) => {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    result
                }
                None => Err(CompletionError::RequestFailed(
                    "no more scripted responses".to_string(),
                )),
            }
        })
    }

    fn metadata(&self) -> ClientMetadata {
        self.metadata.clone()
    }
}
