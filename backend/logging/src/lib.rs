//! Structured logging for chatmem.
//!
//! Console plus rolling NDJSON file output, secret redaction, and the
//! `chat_events` audit stream.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{CHAT_EVENT_TARGET, ChatEvent, ChatEventLogger, EventLogEntry};
pub use logger::{LOG_FILE_NAME, init_logger};
pub use redact::redact_sensitive_data;
