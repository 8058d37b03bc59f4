//! Memory manager: the enable/pause rules deciding which messages reach the gateway.

use chrono::Utc;
use tracing::debug;

use chatmem_core::Message;

use crate::types::{ApiPayload, DEFAULT_SYSTEM_PROMPT, MemoryState};

/// Owns the memory message list and its enabled/paused flags.
///
/// `messages[0]` is the system message. Clearing always falls back to the
/// system message the manager was created with.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    initial_system_message: Message,
    state: MemoryState,
}

impl MemoryManager {
    pub fn new(initial_system_message: Message) -> Self {
        let state = MemoryState {
            enabled: true,
            paused: false,
            messages: vec![initial_system_message.clone()],
        };
        Self {
            initial_system_message,
            state,
        }
    }

    /// Start from a system message with the given text.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self::new(Message::system(prompt).stamped())
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn initial_system_message(&self) -> &Message {
        &self.initial_system_message
    }

    fn accepts_messages(&self) -> bool {
        self.state.enabled && !self.state.paused
    }

    /// Append a message with a fresh timestamp. Dropped while disabled or paused.
    pub fn add_message(&mut self, message: Message) {
        if !self.accepts_messages() {
            debug!(
                enabled = self.state.enabled,
                paused = self.state.paused,
                "Memory not accepting messages; dropping"
            );
            return;
        }
        self.state.messages.push(message.with_timestamp(Utc::now()));
    }

    /// Append a batch in order, under the same rule as [`add_message`](Self::add_message).
    pub fn add_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        if !self.accepts_messages() {
            debug!(
                enabled = self.state.enabled,
                paused = self.state.paused,
                "Memory not accepting messages; dropping batch"
            );
            return;
        }
        let now = Utc::now();
        self.state
            .messages
            .extend(messages.into_iter().map(|m| m.with_timestamp(now)));
    }

    /// Reset to the initial system message, regardless of flags.
    pub fn clear_memory(&mut self) {
        self.state.messages = vec![self.initial_system_message.clone()];
        debug!("Memory cleared");
    }

    pub fn toggle_memory(&mut self) {
        self.state.enabled = !self.state.enabled;
    }

    pub fn toggle_pause(&mut self) {
        self.state.paused = !self.state.paused;
    }

    /// Replace the message at index 0 with a new system message, keeping the
    /// rest in order.
    pub fn update_system_message(&mut self, content: impl Into<String>) {
        let system = Message::system(content).with_timestamp(Utc::now());
        match self.state.messages.first_mut() {
            Some(first) => *first = system,
            None => self.state.messages.push(system),
        }
    }

    /// Replace the whole history with an edited list.
    ///
    /// The current system message is kept in front when `messages` does not
    /// start with one.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        let leading_system = messages.first().is_some_and(Message::is_system);
        if leading_system {
            self.state.messages = messages;
            return;
        }
        let system = self
            .state
            .messages
            .first()
            .filter(|m| m.is_system())
            .cloned()
            .unwrap_or_else(|| self.initial_system_message.clone());
        let mut next = Vec::with_capacity(messages.len() + 1);
        next.push(system);
        next.extend(messages);
        self.state.messages = next;
    }

    /// Messages to send to the gateway: only the initial system message while
    /// disabled, otherwise the full list.
    pub fn api_payload(&self) -> &[Message] {
        if !self.state.enabled {
            return std::slice::from_ref(&self.initial_system_message);
        }
        &self.state.messages
    }

    /// The payload followed by the message about to be sent.
    pub fn messages_for_request(&self, current: Message) -> Vec<Message> {
        let payload = self.api_payload();
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.extend_from_slice(payload);
        out.push(current);
        out
    }

    /// Split the outgoing payload into system message, history, and current message.
    pub fn payload_breakdown(&self, current: Option<&Message>) -> ApiPayload {
        let payload = self.api_payload();
        let (system_message, memory_messages) = match payload.split_first() {
            Some((first, rest)) if first.is_system() => (first.clone(), rest.to_vec()),
            _ => (self.initial_system_message.clone(), payload.to_vec()),
        };
        ApiPayload {
            system_message,
            memory_messages,
            current_message: current.cloned(),
        }
    }

    /// Number of user/assistant messages currently held.
    pub fn conversation_len(&self) -> usize {
        self.state.messages.iter().filter(|m| !m.is_system()).count()
    }

    /// User/assistant messages in order, without system messages.
    pub fn conversation(&self) -> Vec<Message> {
        self.state
            .messages
            .iter()
            .filter(|m| !m.is_system())
            .cloned()
            .collect()
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::with_system_prompt(DEFAULT_SYSTEM_PROMPT)
    }
}
