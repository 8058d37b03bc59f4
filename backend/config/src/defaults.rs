//! Config defaults: fills every unset field after load.

use crate::schema::{
    ChatMemConfig, GatewayConfig, LoggingConfig, MemoryConfig, StorageConfig, SummaryConfig,
    ApiProvider, MODEL_PRESET_DEFAULT,
};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default max tokens for model responses.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

pub use chatmem_memory::DEFAULT_SYSTEM_PROMPT as DEFAULT_SYSTEM_MESSAGE;

/// Default token budget for the context-window view.
pub use chatmem_memory::DEFAULT_TOKEN_LIMIT;

/// Conversation length that makes a summary due.
pub const DEFAULT_SUMMARY_TRIGGER_MESSAGES: usize = 20;

/// Minimum seconds between automatic summaries.
pub const DEFAULT_SUMMARY_MIN_INTERVAL_SECS: u64 = 30;

/// Messages kept verbatim after a summary.
pub const DEFAULT_SUMMARY_KEEP_RECENT: usize = 6;

pub use chatmem_chat::DEFAULT_STATE_KEY;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ChatMemConfig) -> ChatMemConfig {
    let config = apply_gateway_defaults(config);
    let config = apply_memory_defaults(config);
    let config = apply_storage_defaults(config);
    apply_logging_defaults(config)
}

/// Provider, model preset, and sampling settings.
fn apply_gateway_defaults(mut config: ChatMemConfig) -> ChatMemConfig {
    let gateway = config.gateway.get_or_insert_with(GatewayConfig::default);
    gateway.provider.get_or_insert(ApiProvider::default());
    gateway
        .model
        .get_or_insert_with(|| MODEL_PRESET_DEFAULT.to_string());
    gateway.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    gateway.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    config
}

fn apply_memory_defaults(mut config: ChatMemConfig) -> ChatMemConfig {
    let memory = config.memory.get_or_insert_with(MemoryConfig::default);
    memory
        .system_message
        .get_or_insert_with(|| DEFAULT_SYSTEM_MESSAGE.to_string());
    memory.token_limit.get_or_insert(DEFAULT_TOKEN_LIMIT);

    let summary = memory.summary.get_or_insert_with(SummaryConfig::default);
    summary
        .trigger_messages
        .get_or_insert(DEFAULT_SUMMARY_TRIGGER_MESSAGES);
    summary
        .min_interval_secs
        .get_or_insert(DEFAULT_SUMMARY_MIN_INTERVAL_SECS);
    summary.keep_recent.get_or_insert(DEFAULT_SUMMARY_KEEP_RECENT);
    config
}

/// Directories stay unset; they resolve against the config dir at runtime.
fn apply_storage_defaults(mut config: ChatMemConfig) -> ChatMemConfig {
    let storage = config.storage.get_or_insert_with(StorageConfig::default);
    storage
        .state_key
        .get_or_insert_with(|| DEFAULT_STATE_KEY.to_string());
    config
}

fn apply_logging_defaults(mut config: ChatMemConfig) -> ChatMemConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}
