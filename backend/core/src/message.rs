use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatMemError;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Capitalized label used by the editable transcript format.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatMemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ChatMemError::InvalidTranscript(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

/// Delivery state of a message in a conversation's display list.
///
/// Messages loaded from older state files carry no status and are treated as
/// confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Appended locally, waiting on the gateway.
    Pending,
    #[default]
    Confirmed,
    /// The gateway call that carried this message failed.
    Failed,
}

impl MessageStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MessageStatus::Confirmed)
    }
}

/// A single role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "MessageStatus::is_confirmed")]
    pub status: MessageStatus,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
            status: MessageStatus::Confirmed,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamp the message with the current time.
    pub fn stamped(self) -> Self {
        self.with_timestamp(Utc::now())
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip_through_str() {
        for role in [Role::System, Role::User, Role::Assistant] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(" USER ".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn test_confirmed_status_is_omitted_from_json() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "user", "content": "hi" }));

        let failed = Message::user("hi").with_status(MessageStatus::Failed);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
    }

    #[test]
    fn test_missing_status_defaults_to_confirmed() {
        let msg: Message = serde_json::from_str(
            r#"{"role":"assistant","content":"hello","timestamp":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.status, MessageStatus::Confirmed);
        assert!(msg.timestamp.is_some());
    }
}
