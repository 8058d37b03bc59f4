//! Editable text forms of memory.
//!
//! Two formats are supported: the block form written by [`format_transcript`]
//!
//! ```text
//! User {
//! What is Rust?
//! }
//!
//! Assistant {
//! A systems language.
//! }
//! ```
//!
//! and a looser `role: content` form where blocks are separated by blank lines.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use chatmem_core::{ChatMemError, Message, Result, Role};

static BLOCK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Assistant|User|System)\s*\{").unwrap());

/// Render messages as `Role {\ncontent\n}` blocks separated by blank lines.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{} {{\n{}\n}}", m.role.display_name(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parse the block form back into messages, stamped with the current time.
///
/// Each block's content runs up to the first closing brace. Text before the
/// first header is ignored. An empty block is rejected.
pub fn parse_transcript(text: &str) -> Result<Vec<Message>> {
    let headers: Vec<_> = BLOCK_HEADER.captures_iter(text).collect();
    let now = Utc::now();
    let mut messages = Vec::with_capacity(headers.len());

    for (i, caps) in headers.iter().enumerate() {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or_default();
        let next = headers
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let block = &text[whole..next];
        let content = block.split('}').next().unwrap_or_default().trim();
        if content.is_empty() {
            return Err(ChatMemError::InvalidTranscript(
                "Invalid format. Each message must start with \"Role {\"".to_string(),
            ));
        }
        let role: Role = caps[1].parse()?;
        messages.push(Message::new(role, content).with_timestamp(now));
    }

    Ok(messages)
}

/// Parse blank-line separated `role: content` blocks.
///
/// `a:` is shorthand for assistant. Blocks without a `role: ` prefix continue the
/// previous message. Other roles, including system, are skipped.
pub fn parse_plain_memory(text: &str) -> Vec<Message> {
    let now = Utc::now();
    let mut messages: Vec<Message> = Vec::new();

    for block in text.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let Some((prefix, content)) = block.split_once(": ") else {
            if let Some(last) = messages.last_mut() {
                last.content.push_str("\n\n");
                last.content.push_str(block);
            }
            continue;
        };
        let role = match prefix.to_lowercase().as_str() {
            "user" => Role::User,
            "assistant" | "a" => Role::Assistant,
            _ => continue,
        };
        messages.push(Message::new(role, content).with_timestamp(now));
    }

    messages
}

/// Parse an edited memory file in either form.
///
/// The block form wins when the text has any `Role {` header; otherwise the
/// text is read as `role: content` blocks.
pub fn parse_edited_memory(text: &str) -> Result<Vec<Message>> {
    if BLOCK_HEADER.is_match(text) {
        return parse_transcript(text);
    }
    Ok(parse_plain_memory(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(messages: &[Message]) -> Vec<(Role, &str)> {
        messages.iter().map(|m| (m.role, m.content.as_str())).collect()
    }

    #[test]
    fn test_format_transcript() {
        let text = format_transcript(&[
            Message::system("Be brief."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ]);
        assert_eq!(
            text,
            "System {\nBe brief.\n}\n\nUser {\nHi\n}\n\nAssistant {\nHello!\n}"
        );
    }

    #[test]
    fn test_parse_formatted_transcript() {
        let original = vec![
            Message::system("Be brief."),
            Message::user("What is 2 + 2?"),
            Message::assistant("4"),
        ];
        let parsed = parse_transcript(&format_transcript(&original)).unwrap();
        assert_eq!(contents(&parsed), contents(&original));
        assert!(parsed.iter().all(|m| m.timestamp.is_some()));
    }

    #[test]
    fn test_parse_transcript_multiline_content() {
        let parsed = parse_transcript("User {\nline one\nline two\n}\nAssistant{ ok }").unwrap();
        assert_eq!(
            contents(&parsed),
            [(Role::User, "line one\nline two"), (Role::Assistant, "ok")]
        );
    }

    #[test]
    fn test_parse_transcript_rejects_empty_block() {
        let err = parse_transcript("User {\n}\n\nAssistant {\nhi\n}").unwrap_err();
        assert!(matches!(err, ChatMemError::InvalidTranscript(_)));
    }

    #[test]
    fn test_parse_transcript_without_headers() {
        assert!(parse_transcript("just some notes").unwrap().is_empty());
    }

    #[test]
    fn test_parse_plain_memory() {
        let text = "user: hello there\n\na: hi!\n\nsecond paragraph\n\nsystem: ignored\n\nAssistant: bye";
        let parsed = parse_plain_memory(text);
        assert_eq!(
            contents(&parsed),
            [
                (Role::User, "hello there"),
                (Role::Assistant, "hi!\n\nsecond paragraph"),
                (Role::Assistant, "bye"),
            ]
        );
    }

    #[test]
    fn test_parse_edited_memory_picks_format() {
        let blocks = parse_edited_memory("User {\nhi\n}\n\nAssistant {\nhello\n}").unwrap();
        assert_eq!(contents(&blocks), [(Role::User, "hi"), (Role::Assistant, "hello")]);

        let plain = parse_edited_memory("user: hi\n\na: hello").unwrap();
        assert_eq!(contents(&plain), [(Role::User, "hi"), (Role::Assistant, "hello")]);

        assert!(parse_edited_memory("User {\n}").is_err());
    }

    #[test]
    fn test_parse_plain_memory_empty() {
        assert!(parse_plain_memory("   \n\n  ").is_empty());
        assert!(parse_plain_memory("orphan continuation").is_empty());
    }
}
