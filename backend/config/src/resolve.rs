//! Effective runtime settings derived from a loaded config.
//!
//! Accessors fall back to the built-in defaults, so they give the same answer
//! whether or not [`crate::apply_all_defaults`] has run.

use std::path::{Path, PathBuf};

use crate::defaults::{
    DEFAULT_LOG_LEVEL, DEFAULT_MAX_TOKENS, DEFAULT_STATE_KEY, DEFAULT_SUMMARY_KEEP_RECENT,
    DEFAULT_SUMMARY_MIN_INTERVAL_SECS, DEFAULT_SUMMARY_TRIGGER_MESSAGES, DEFAULT_SYSTEM_MESSAGE,
    DEFAULT_TEMPERATURE, DEFAULT_TOKEN_LIMIT,
};
use crate::schema::{resolve_model, ApiProvider, ChatMemConfig, MODEL_PRESET_DEFAULT};

/// Everything needed to open a connection to the completion API.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGateway {
    pub provider: ApiProvider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarySettings {
    pub trigger_messages: usize,
    pub min_interval_secs: u64,
    pub keep_recent: usize,
}

impl ChatMemConfig {
    /// Gateway settings, reading the provider's key variable when `apiKey` is unset.
    pub fn resolve_gateway(&self) -> ResolvedGateway {
        self.resolve_gateway_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_gateway_with(&self, env: impl Fn(&str) -> Option<String>) -> ResolvedGateway {
        let gw = self.gateway.clone().unwrap_or_default();
        let provider = gw.provider.unwrap_or_default();
        let api_key = gw
            .api_key
            .or_else(|| env(provider.api_key_env()))
            .filter(|k| !k.is_empty());
        ResolvedGateway {
            provider,
            base_url: gw
                .endpoint
                .unwrap_or_else(|| provider.default_endpoint().to_string()),
            api_key,
            model: resolve_model(gw.model.as_deref().unwrap_or(MODEL_PRESET_DEFAULT)).to_string(),
            temperature: gw.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: gw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    pub fn system_message(&self) -> &str {
        self.memory
            .as_ref()
            .and_then(|m| m.system_message.as_deref())
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE)
    }

    pub fn token_limit(&self) -> usize {
        self.memory
            .as_ref()
            .and_then(|m| m.token_limit)
            .unwrap_or(DEFAULT_TOKEN_LIMIT)
    }

    pub fn summary_settings(&self) -> SummarySettings {
        let summary = self
            .memory
            .as_ref()
            .and_then(|m| m.summary.clone())
            .unwrap_or_default();
        SummarySettings {
            trigger_messages: summary
                .trigger_messages
                .unwrap_or(DEFAULT_SUMMARY_TRIGGER_MESSAGES),
            min_interval_secs: summary
                .min_interval_secs
                .unwrap_or(DEFAULT_SUMMARY_MIN_INTERVAL_SECS),
            keep_recent: summary.keep_recent.unwrap_or(DEFAULT_SUMMARY_KEEP_RECENT),
        }
    }

    pub fn state_key(&self) -> &str {
        self.storage
            .as_ref()
            .and_then(|s| s.state_key.as_deref())
            .unwrap_or(DEFAULT_STATE_KEY)
    }

    /// Chat state directory; relative paths resolve against `config_dir`.
    pub fn data_dir(&self, config_dir: &Path) -> PathBuf {
        let dir = self.storage.as_ref().and_then(|s| s.data_dir.as_deref());
        resolve_dir(config_dir, dir, "data")
    }

    pub fn log_dir(&self, config_dir: &Path) -> PathBuf {
        let dir = self.logging.as_ref().and_then(|l| l.dir.as_deref());
        resolve_dir(config_dir, dir, "logs")
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

fn resolve_dir(config_dir: &Path, configured: Option<&str>, fallback: &str) -> PathBuf {
    match configured {
        Some(dir) if !dir.is_empty() => {
            let path = PathBuf::from(dir);
            if path.is_absolute() {
                path
            } else {
                config_dir.join(path)
            }
        }
        _ => config_dir.join(fallback),
    }
}
