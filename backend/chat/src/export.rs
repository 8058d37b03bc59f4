//! Single-conversation export files: `{ "version": "1.0", "chat": { .. } }`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use chatmem_core::{Chat, ChatMemError, Result};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExport {
    pub version: String,
    pub chat: Chat,
}

impl ChatExport {
    pub fn new(chat: Chat) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            chat,
        }
    }
}

/// Pretty-printed export envelope for `chat`.
pub fn export_chat(chat: &Chat) -> Result<String> {
    serde_json::to_string_pretty(&ChatExport::new(chat.clone()))
        .map_err(|e| ChatMemError::Other(e.into()))
}

/// Parse an export envelope. `version`, `chat`, and `chat.id` must be present;
/// nothing is returned unless the whole conversation parses.
pub fn import_chat(raw: &str) -> Result<Chat> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ChatMemError::InvalidImport(format!("not valid JSON: {e}")))?;

    let version = value
        .get("version")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| invalid("missing version"))?;
    let chat = value
        .get("chat")
        .filter(|c| c.is_object())
        .ok_or_else(|| invalid("missing chat"))?;
    chat.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid("missing chat.id"))?;

    if version != EXPORT_VERSION {
        warn!(version, expected = EXPORT_VERSION, "Importing chat export with unexpected version");
    }

    serde_json::from_value(chat.clone())
        .map_err(|e| ChatMemError::InvalidImport(format!("malformed chat: {e}")))
}

fn invalid(reason: &str) -> ChatMemError {
    ChatMemError::InvalidImport(format!("Invalid chat export file format: {reason}"))
}

/// File name for an export: slugged title plus the first eight id characters.
///
/// The slug keeps only `[a-z0-9-]`; any other run of characters becomes one `-`.
/// When nothing survives, the name is just the short id.
pub fn export_file_name(chat: &Chat) -> String {
    let short_id: String = chat
        .id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(8)
        .collect();
    let slug = slugify(&chat.title);
    match (slug.is_empty(), short_id.is_empty()) {
        (true, true) => "chat.json".to_string(),
        (true, false) => format!("{short_id}.json"),
        (false, true) => format!("{slug}.json"),
        (false, false) => format!("{slug}-{short_id}.json"),
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Write `chat` into `dir` and return the file path.
pub async fn export_to_dir(chat: &Chat, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ChatMemError::StorageError(format!("Failed to create {}: {e}", dir.display())))?;
    let path = dir.join(export_file_name(chat));
    tokio::fs::write(&path, export_chat(chat)?)
        .await
        .map_err(|e| ChatMemError::StorageError(format!("Failed to write {}: {e}", path.display())))?;
    info!(chat_id = %chat.id, path = %path.display(), "Exported chat");
    Ok(path)
}

pub async fn import_from_file(path: &Path) -> Result<Chat> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ChatMemError::StorageError(format!("Failed to read {}: {e}", path.display())))?;
    let chat = import_chat(&raw)?;
    info!(chat_id = %chat.id, path = %path.display(), "Imported chat");
    Ok(chat)
}
