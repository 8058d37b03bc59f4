//! Conversation memory for chatmem: what gets sent, what fits, what gets summarized.

pub mod context_window;
pub mod manager;
pub mod summarizer;
pub mod tokenizer;
pub mod transcript;
pub mod types;

pub use context_window::{ContextWindow, ContextWindowReport, DEFAULT_TOKEN_LIMIT, WindowWord, WordBudget};
pub use manager::MemoryManager;
pub use summarizer::{
    is_summary_message, parse_points, summary_request, truncate_with_summary, Summarizer, SummaryPolicy, SUMMARY_PREFIX,
};
pub use tokenizer::{SubwordTokenizer, Tokenizer, WhitespaceTokenizer};
pub use transcript::{format_transcript, parse_edited_memory, parse_plain_memory, parse_transcript};
pub use types::{ApiPayload, DEFAULT_SYSTEM_PROMPT, MemoryState, SummaryState};
