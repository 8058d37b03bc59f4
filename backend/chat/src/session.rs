//! A chat session: the conversation list bound to a store and a gateway.
//!
//! Every committed mutation is written back to the store before the call
//! returns.

use std::sync::Arc;

use tracing::{debug, error, info};

use chatmem_core::{
    Chat, ChatMemError, CompletionGateway, CompletionRequest, Message, MessageStatus, Result,
};
use chatmem_logging::{ChatEvent, ChatEventLogger};

use crate::export;
use crate::state::ChatState;
use crate::store::StateStore;

/// System prompt for ordinary turns; the conversation's notebook is appended.
pub const COLLAB_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Use the following context from the collaboration space to inform your responses: ";

/// System prompt for one-off summary requests.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Your task is to create a concise, clear summary of the key points. Return only the summary text, no additional commentary or meta-references.";

/// Prompt asking for a single notebook bullet distilled from `message`.
pub fn notebook_point_prompt(message: &str) -> String {
    format!(
        "Please review this message and create a single, concise bullet point that captures the most important or noteworthy information. The bullet point should:
- Be clear and standalone (understandable without context)
- Focus on technical details, solutions, or key insights
- Be written in a neutral, documentation-style tone
- Not include any conversational phrases or meta-references
- Be under 120 characters if possible

Message to summarize:
{message}"
    )
}

/// Notebook bullet line for `point`.
pub fn notebook_item(point: &str) -> String {
    format!("- {}\n", point.trim())
}

/// Append an item to notebook text, separated from existing content by a newline.
pub fn append_notebook_item(content: &str, item: &str) -> String {
    if content.is_empty() {
        item.to_string()
    } else {
        format!("{content}\n{item}")
    }
}

pub struct ChatSession {
    state: ChatState,
    store: Arc<dyn StateStore>,
    gateway: Arc<dyn CompletionGateway>,
    model: Option<String>,
}

impl ChatSession {
    /// Restore the saved state, or start empty.
    pub async fn load(store: Arc<dyn StateStore>, gateway: Arc<dyn CompletionGateway>) -> Result<Self> {
        let state = store.load().await?.unwrap_or_default();
        debug!(chats = state.chats.len(), gateway = gateway.name(), "Chat session loaded");
        Ok(Self {
            state,
            store,
            gateway,
            model: None,
        })
    }

    /// Model override sent with every request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.state.current_chat()
    }

    async fn persist(&self) -> Result<()> {
        self.store.save(&self.state).await
    }

    fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        let request = CompletionRequest::new(messages);
        match &self.model {
            Some(model) => request.with_model(model.clone()),
            None => request,
        }
    }

    pub async fn new_chat(&mut self) -> Result<String> {
        let id = self.state.create_new_chat();
        self.persist().await?;
        info!(chat_id = %id, "Created chat");
        Ok(id)
    }

    pub async fn use_chat(&mut self, id: &str) -> Result<()> {
        self.state.set_current_chat(id)?;
        self.persist().await
    }

    pub async fn rename_chat(&mut self, id: &str, title: &str) -> Result<()> {
        self.state.rename_chat(id, title)?;
        self.persist().await
    }

    pub async fn update_collab_space(&mut self, content: &str) -> Result<()> {
        self.state.update_collab_space(content)?;
        self.persist().await
    }

    pub async fn hide_user_messages(&mut self, id: &str) -> Result<()> {
        self.state.hide_user_messages(id)?;
        self.persist().await
    }

    pub async fn update_chat_messages(&mut self, id: &str, messages: Vec<Message>) -> Result<()> {
        self.state.update_chat_messages(id, messages)?;
        self.persist().await
    }

    /// Forget every conversation and delete the saved state.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.state.clear_all();
        self.store.remove().await?;
        ChatEventLogger::log_event("*", ChatEvent::MemoryCleared);
        info!("Cleared all chats");
        Ok(())
    }

    /// Add an imported conversation and make it current.
    pub async fn import_chat(&mut self, chat: Chat) -> Result<String> {
        let id = chat.id.clone();
        self.state.insert_chat(chat);
        self.persist().await?;
        Ok(id)
    }

    pub fn export_chat(&self, id: &str) -> Result<String> {
        let chat = self
            .state
            .chat(id)
            .ok_or_else(|| ChatMemError::ChatNotFound(id.to_string()))?;
        export::export_chat(chat)
    }

    /// Send `content` in the current conversation and return the reply.
    ///
    /// Unless hidden, the user message is appended as pending before the
    /// request and marked confirmed or failed afterwards. A failed send keeps
    /// the user message but adds no reply.
    pub async fn send_message(&mut self, content: &str, hide_user_message: bool) -> Result<Message> {
        let chat = self.state.current_chat().ok_or(ChatMemError::NoCurrentChat)?;
        let chat_id = chat.id.clone();

        let mut messages = Vec::with_capacity(chat.messages.len() + 2);
        messages.push(Message::system(format!("{COLLAB_SYSTEM_PROMPT}{}", chat.collab_space)));
        messages.extend(chat.messages.iter().filter(|m| m.status.is_confirmed()).cloned());

        let user_message = Message::user(content).stamped();
        messages.push(user_message.clone());

        let pending_index = if hide_user_message {
            None
        } else {
            let chat = self.state.current_chat_mut()?;
            chat.messages
                .push(user_message.clone().with_status(MessageStatus::Pending));
            chat.touch();
            let index = chat.messages.len() - 1;
            if let Err(e) = self.persist().await {
                let chat = self.state.current_chat_mut()?;
                if let Some(message) = chat.messages.get_mut(index) {
                    message.status = MessageStatus::Failed;
                }
                error!(chat_id = %chat_id, error = %e, "Failed to save pending message");
                return Err(e);
            }
            Some(index)
        };

        ChatEventLogger::log_event(
            &chat_id,
            ChatEvent::MessageSent {
                role: user_message.role.to_string(),
                content: user_message.content.clone(),
            },
        );

        let request = self.request(messages);
        let outcome = self.gateway.complete(&request).await;

        let chat = self.state.current_chat_mut()?;
        let result = match outcome {
            Ok(completion) => {
                if let Some(message) = pending_index.and_then(|i| chat.messages.get_mut(i)) {
                    message.status = MessageStatus::Confirmed;
                }
                let reply = completion.message.stamped();
                chat.messages.push(reply.clone());
                ChatEventLogger::log_event(
                    &chat_id,
                    ChatEvent::ReplyReceived {
                        provider: completion.provider,
                        model: completion.model,
                        latency_ms: completion.latency_ms,
                        total_tokens: completion.usage.total_tokens,
                    },
                );
                Ok(reply)
            }
            Err(e) => {
                if let Some(message) = pending_index.and_then(|i| chat.messages.get_mut(i)) {
                    message.status = MessageStatus::Failed;
                }
                error!(chat_id = %chat_id, error = %e, "Error sending message");
                ChatEventLogger::log_event(&chat_id, ChatEvent::GatewayFailed { error_msg: e.to_string() });
                Err(e)
            }
        };
        chat.touch();

        self.persist().await?;
        result
    }

    /// One-off summary request. History is neither sent nor modified.
    pub async fn request_summary(&self, content: &str) -> Result<String> {
        if self.state.current_chat().is_none() {
            return Err(ChatMemError::NoCurrentChat);
        }
        let request = self.request(vec![
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user(content).stamped(),
        ]);
        let completion = self.gateway.complete(&request).await.inspect_err(|e| {
            error!(error = %e, "Error getting summary");
        })?;
        Ok(completion.message.content)
    }

    /// Distill the last assistant message into a notebook bullet.
    ///
    /// Returns the appended item, or `None` when the conversation has no
    /// assistant message yet.
    pub async fn add_notebook_point(&mut self) -> Result<Option<String>> {
        let chat = self.state.current_chat().ok_or(ChatMemError::NoCurrentChat)?;
        let Some(last) = chat.last_assistant_message() else {
            return Ok(None);
        };
        let prompt = notebook_point_prompt(&last.content);

        let point = self.request_summary(&prompt).await?;
        if point.trim().is_empty() {
            return Ok(None);
        }

        let item = notebook_item(&point);
        let chat = self.state.current_chat_mut()?;
        chat.collab_space = append_notebook_item(&chat.collab_space, &item);
        chat.touch();
        let chat_id = chat.id.clone();
        self.persist().await?;
        info!(chat_id = %chat_id, "Added notebook point");
        Ok(Some(item))
    }
}
