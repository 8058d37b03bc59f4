//! The persisted collection of conversations and the current selection.

use serde::{Deserialize, Serialize};

use chatmem_core::{Chat, ChatMemError, Message, Result, Role};

/// Every conversation plus which one is current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    pub chats: Vec<Chat>,
    pub current_chat_id: Option<String>,
    #[serde(default)]
    pub collab_space: String,
}

impl ChatState {
    /// Create an empty conversation and make it current. Returns its id.
    pub fn create_new_chat(&mut self) -> String {
        let chat = Chat::new();
        let id = chat.id.clone();
        self.chats.push(chat);
        self.current_chat_id = Some(id.clone());
        id
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    fn chat_mut(&mut self, id: &str) -> Result<&mut Chat> {
        self.chats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ChatMemError::ChatNotFound(id.to_string()))
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.current_chat_id.as_deref().and_then(|id| self.chat(id))
    }

    pub fn current_chat_mut(&mut self) -> Result<&mut Chat> {
        let id = self
            .current_chat_id
            .clone()
            .ok_or(ChatMemError::NoCurrentChat)?;
        self.chat_mut(&id)
    }

    pub fn set_current_chat(&mut self, id: &str) -> Result<()> {
        if self.chat(id).is_none() {
            return Err(ChatMemError::ChatNotFound(id.to_string()));
        }
        self.current_chat_id = Some(id.to_string());
        Ok(())
    }

    pub fn rename_chat(&mut self, id: &str, title: impl Into<String>) -> Result<()> {
        let chat = self.chat_mut(id)?;
        chat.title = title.into();
        chat.touch();
        Ok(())
    }

    /// Replace the current conversation's notebook text.
    pub fn update_collab_space(&mut self, content: impl Into<String>) -> Result<()> {
        let chat = self.current_chat_mut()?;
        chat.collab_space = content.into();
        chat.touch();
        Ok(())
    }

    /// Drop everything but assistant messages from a conversation.
    pub fn hide_user_messages(&mut self, id: &str) -> Result<()> {
        let chat = self.chat_mut(id)?;
        chat.messages.retain(|m| m.role == Role::Assistant);
        Ok(())
    }

    /// Replace a conversation's messages wholesale (memory editing).
    pub fn update_chat_messages(&mut self, id: &str, messages: Vec<Message>) -> Result<()> {
        let chat = self.chat_mut(id)?;
        chat.messages = messages;
        chat.touch();
        Ok(())
    }

    /// Add an imported conversation and select it. A conversation with the
    /// same id is replaced in place.
    pub fn insert_chat(&mut self, chat: Chat) {
        let id = chat.id.clone();
        match self.chats.iter_mut().find(|c| c.id == id) {
            Some(existing) => *existing = chat,
            None => self.chats.push(chat),
        }
        self.current_chat_id = Some(id);
    }

    pub fn clear_all(&mut self) {
        *self = ChatState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_new_chat_selects_it() {
        let mut state = ChatState::default();
        let first = state.create_new_chat();
        let second = state.create_new_chat();
        assert_ne!(first, second);
        assert_eq!(state.chats.len(), 2);
        assert_eq!(state.current_chat().unwrap().id, second);
    }

    #[test]
    fn test_set_current_chat_unknown_id() {
        let mut state = ChatState::default();
        let id = state.create_new_chat();
        assert!(matches!(
            state.set_current_chat("nope"),
            Err(ChatMemError::ChatNotFound(_))
        ));
        assert_eq!(state.current_chat_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_rename_chat_bumps_updated_at() {
        let mut state = ChatState::default();
        let id = state.create_new_chat();
        let before = state.chat(&id).unwrap().updated_at;
        state.rename_chat(&id, "Rust questions").unwrap();
        let chat = state.chat(&id).unwrap();
        assert_eq!(chat.title, "Rust questions");
        assert!(chat.updated_at >= before);
    }

    #[test]
    fn test_update_collab_space_requires_current_chat() {
        let mut state = ChatState::default();
        assert!(matches!(
            state.update_collab_space("notes"),
            Err(ChatMemError::NoCurrentChat)
        ));
        state.create_new_chat();
        state.update_collab_space("- remember tokio").unwrap();
        assert_eq!(state.current_chat().unwrap().collab_space, "- remember tokio");
    }

    #[test]
    fn test_hide_user_messages() {
        let mut state = ChatState::default();
        let id = state.create_new_chat();
        state
            .update_chat_messages(
                &id,
                vec![
                    Message::user("q1"),
                    Message::assistant("a1"),
                    Message::user("q2"),
                    Message::assistant("a2"),
                ],
            )
            .unwrap();
        state.hide_user_messages(&id).unwrap();
        let contents: Vec<_> = state.chat(&id).unwrap().messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a1", "a2"]);
    }

    #[test]
    fn test_insert_chat_replaces_same_id() {
        let mut state = ChatState::default();
        let id = state.create_new_chat();
        state.create_new_chat();

        let mut imported = state.chat(&id).unwrap().clone();
        imported.title = "Imported".into();
        state.insert_chat(imported);

        assert_eq!(state.chats.len(), 2);
        assert_eq!(state.current_chat().unwrap().title, "Imported");
    }

    #[test]
    fn test_clear_all() {
        let mut state = ChatState::default();
        state.create_new_chat();
        state.collab_space = "scratch".into();
        state.clear_all();
        assert_eq!(state, ChatState::default());
    }

    #[test]
    fn test_state_json_shape() {
        let mut state = ChatState::default();
        state.create_new_chat();
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["chats"].is_array());
        assert!(json["currentChatId"].is_string());
        assert_eq!(json["collabSpace"], "");
    }
}
