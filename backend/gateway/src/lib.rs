//! Completion gateways: the chat-completion APIs chatmem talks to.

pub mod openai;
pub mod scripted;

pub use openai::{GatewaySettings, OpenAiCompatGateway};
pub use scripted::ScriptedGateway;
