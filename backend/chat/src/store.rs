//! Whole-state persistence: one serialized blob under a fixed key.
//!
//! Every save overwrites the blob; clearing removes it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use chatmem_core::{ChatMemError, Result};

use crate::state::ChatState;

/// Storage key used when none is configured.
pub const DEFAULT_STATE_KEY: &str = "chatmem-state";

/// Where a [`ChatState`] lives between runs.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the saved state, or `None` if nothing was saved.
    async fn load(&self) -> Result<Option<ChatState>>;

    /// Overwrite the saved state.
    async fn save(&self, state: &ChatState) -> Result<()>;

    /// Delete the saved state.
    async fn remove(&self) -> Result<()>;
}

fn storage_err(e: anyhow::Error) -> ChatMemError {
    ChatMemError::StorageError(format!("{e:#}"))
}

/// JSON file at `<dir>/<key>.json`, written atomically.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<Option<ChatState>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!(path = %self.path.display(), "No saved chat state");
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read chat state: {}", self.path.display()))
            .map_err(storage_err)?;
        let state: ChatState = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse chat state: {}", self.path.display()))
            .map_err(storage_err)?;
        info!(path = %self.path.display(), chats = state.chats.len(), "Loaded chat state");
        Ok(Some(state))
    }

    async fn save(&self, state: &ChatState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create state directory: {}", parent.display()))
                .map_err(storage_err)?;
        }

        let json = serde_json::to_string_pretty(state)
            .context("Failed to serialize chat state")
            .map_err(storage_err)?;

        // Write to temp file, then rename for atomicity.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write temp state: {}", tmp_path.display()))
            .map_err(storage_err)?;
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to rename temp state to: {}", self.path.display()))
            .map_err(storage_err)?;

        debug!(path = %self.path.display(), "Saved chat state");
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Removed chat state");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChatMemError::StorageError(format!(
                "Failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// Keeps the serialized blob in memory.
#[derive(Default)]
pub struct InMemoryStore {
    blob: Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw saved JSON, if any.
    pub fn raw(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|b| b.clone())
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn load(&self) -> Result<Option<ChatState>> {
        let Some(raw) = self.raw() else {
            return Ok(None);
        };
        let state = serde_json::from_str(&raw)
            .context("Failed to parse chat state")
            .map_err(storage_err)?;
        Ok(Some(state))
    }

    async fn save(&self, state: &ChatState) -> Result<()> {
        let json = serde_json::to_string(state)
            .context("Failed to serialize chat state")
            .map_err(storage_err)?;
        let mut blob = self
            .blob
            .lock()
            .map_err(|_| ChatMemError::StorageError("state lock poisoned".into()))?;
        *blob = Some(json);
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        let mut blob = self
            .blob
            .lock()
            .map_err(|_| ChatMemError::StorageError("state lock poisoned".into()))?;
        *blob = None;
        Ok(())
    }
}
