//! Runtime wiring: the loaded config turned into gateways, stores, and memory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::info;

use chatmem_chat::{ChatSession, JsonFileStore, StateStore};
use chatmem_config::{ChatMemConfig, ResolvedGateway};
use chatmem_core::CompletionGateway;
use chatmem_gateway::{GatewaySettings, OpenAiCompatGateway};
use chatmem_memory::{ContextWindow, MemoryManager, SubwordTokenizer, Summarizer, SummaryPolicy};

/// chatmem runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `config.yaml`, chat data, and logs
    pub dir: PathBuf,
    pub settings: ChatMemConfig,
}

impl Config {
    /// Load `config.yaml` from `dir_override` or the default config directory.
    pub async fn load(dir_override: Option<PathBuf>) -> Result<Self> {
        let dir = dir_override.unwrap_or_else(chatmem_config::config_dir);
        let path = chatmem_config::config_file_path(&dir);
        let settings = chatmem_config::load_and_prepare(&path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Ok(Self { dir, settings })
    }

    /// Install the global logger using the configured level and directory.
    ///
    /// The console only shows warnings unless `verbose` is set.
    pub fn init_logging(&self, verbose: bool) {
        let level = self.settings.log_level();
        let console_level = if verbose { level } else { "warn" };
        chatmem_logging::init_logger(self.settings.log_dir(&self.dir), level, console_level);
    }

    pub fn gateway(&self) -> Arc<dyn CompletionGateway> {
        let resolved = self.settings.resolve_gateway();
        info!(
            provider = %resolved.provider,
            model = %resolved.model,
            endpoint = %resolved.base_url,
            "Using completion gateway"
        );
        Arc::new(OpenAiCompatGateway::new(gateway_settings(resolved)))
    }

    pub fn store(&self) -> Arc<dyn StateStore> {
        Arc::new(JsonFileStore::new(
            self.settings.data_dir(&self.dir),
            self.settings.state_key(),
        ))
    }

    /// The persisted chat session.
    pub async fn session(&self) -> Result<ChatSession> {
        let session = ChatSession::load(self.store(), self.gateway()).await?;
        Ok(session)
    }

    pub fn memory(&self, system_override: Option<&str>) -> MemoryManager {
        MemoryManager::with_system_prompt(system_override.unwrap_or(self.settings.system_message()))
    }

    pub fn summary_policy(&self) -> SummaryPolicy {
        let s = self.settings.summary_settings();
        SummaryPolicy {
            trigger_messages: s.trigger_messages,
            min_interval: Duration::seconds(s.min_interval_secs as i64),
            keep_recent: s.keep_recent,
        }
    }

    pub fn summarizer(&self, gateway: Arc<dyn CompletionGateway>) -> Summarizer {
        Summarizer::new(gateway).with_policy(self.summary_policy())
    }

    pub fn context_window(&self, limit: Option<usize>) -> ContextWindow {
        ContextWindow::new(
            Arc::new(SubwordTokenizer::new()),
            limit.unwrap_or(self.settings.token_limit()),
        )
    }
}

/// Map resolved config onto the HTTP gateway's settings.
pub fn gateway_settings(resolved: ResolvedGateway) -> GatewaySettings {
    GatewaySettings {
        provider: resolved.provider.to_string(),
        base_url: resolved.base_url,
        api_key: resolved.api_key,
        model: resolved.model,
        temperature: resolved.temperature,
        max_tokens: resolved.max_tokens,
    }
}
