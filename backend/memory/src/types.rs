use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chatmem_core::Message;

/// Text of the system message a fresh memory starts with.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// The history a memory manager will send to the completion gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub enabled: bool,
    pub paused: bool,
    /// System message first, then the retained history in order.
    pub messages: Vec<Message>,
}

/// Bullet-point digest of earlier conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryState {
    pub points: Vec<String>,
    /// `None` until the first summary is produced.
    pub last_updated: Option<DateTime<Utc>>,
}

impl SummaryState {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Breakdown of the next outgoing request, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiPayload {
    pub system_message: Message,
    pub memory_messages: Vec<Message>,
    pub current_message: Option<Message>,
}
