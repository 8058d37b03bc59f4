pub mod conversation;
pub mod error;
pub mod message;
pub mod traits;

pub use conversation::{Chat, DEFAULT_CHAT_TITLE};
pub use error::{ChatMemError, Result};
pub use message::{Message, MessageStatus, Role};
pub use traits::{Completion, CompletionGateway, CompletionRequest, TokenUsage};
