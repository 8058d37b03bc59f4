use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// A hosted chat-completion endpoint: ordered messages in, one reply out.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Provider name (e.g., "openai", "github").
    fn name(&self) -> &str;

    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;

    /// Send the conversation and return the assistant's reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Request to a completion gateway.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Overrides the gateway's default model when set.
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Token counters reported by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A single assistant reply.
#[derive(Debug, Clone)]
pub struct Completion {
    pub message: Message,
    pub usage: TokenUsage,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}
