//! Conversations for chatmem: the multi-chat state, the session that sends
//! messages through a completion gateway, persistence, and export files.

pub mod export;
pub mod session;
pub mod state;
pub mod store;

pub use export::{ChatExport, EXPORT_VERSION, export_chat, export_file_name, import_chat};
pub use session::{COLLAB_SYSTEM_PROMPT, ChatSession, SUMMARY_SYSTEM_PROMPT};
pub use state::ChatState;
pub use store::{DEFAULT_STATE_KEY, InMemoryStore, JsonFileStore, StateStore};
