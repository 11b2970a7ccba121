//! Completion service clients and message types.
//!
//! The [`CompletionApi`] trait is the seam between the decomposition
//! algorithm and the network: production code talks to an
//! OpenAI-compatible endpoint via [`openai::OpenAiApi`], tests substitute
//! scripted implementations.

pub mod client;
pub mod error;
pub mod limiter;
pub mod openai;
#[cfg(test)]
pub(crate) mod test_utils;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;

use crate::ai::error::CompletionError;

/// Timeout applied to every completion HTTP request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Role of one chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction preamble.
    System,
    /// Caller-supplied content.
    User,
    /// Exemplar or prior model output.
    Assistant,
}

/// One role-tagged block of a completion request.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    /// Who the message is attributed to.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A fully-assembled completion request.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    /// Ordered role-tagged blocks forming the prompt.
    pub messages: Vec<ChatMessage>,
}

/// Metadata about a completion service implementation.
#[derive(Clone, Debug)]
pub struct ClientMetadata {
    /// Service provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Total context window in tokens (input + output).
    pub context_limit: usize,
    /// Tokens reserved for the model's response.
    pub max_completion_tokens: usize,
}

/// Trait for completion service clients.
pub trait CompletionApi: Send + Sync {
    /// Sends one request to the completion service and returns its text.
    fn send<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;

    /// Returns metadata about the client implementation.
    fn metadata(&self) -> ClientMetadata;
}
