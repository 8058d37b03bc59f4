//! Chat Event Logger
//!
//! Conversation events written through `tracing` under the `chat_events`
//! target, so the JSON file layer records them as NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

pub const CHAT_EVENT_TARGET: &str = "chat_events";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    MessageSent {
        role: String,
        content: String,
    },
    ReplyReceived {
        provider: String,
        model: String,
        latency_ms: u64,
        total_tokens: u64,
    },
    GatewayFailed {
        error_msg: String,
    },
    Summarized {
        points: usize,
        kept_messages: usize,
    },
    MemoryCleared,
}

impl ChatEvent {
    /// Copy of the event with free text scrubbed.
    fn redacted(mut self) -> Self {
        match &mut self {
            ChatEvent::MessageSent { content, .. } => *content = redact_sensitive_data(content),
            ChatEvent::GatewayFailed { error_msg } => *error_msg = redact_sensitive_data(error_msg),
            _ => {}
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub chat_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ChatEvent,
}

impl EventLogEntry {
    pub fn new(chat_id: &str, event: ChatEvent) -> Self {
        Self {
            chat_id: chat_id.into(),
            timestamp: Utc::now(),
            event: event.redacted(),
        }
    }
}

pub struct ChatEventLogger;

impl ChatEventLogger {
    pub fn log_event(chat_id: &str, event: ChatEvent) {
        let entry = EventLogEntry::new(chat_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "chat_events", chat_id = %entry.chat_id, event = %json, "Chat event");
    }
}
