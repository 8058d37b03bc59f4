//! chatmem configuration schema.
//!
//! Every field is optional on disk; [`crate::apply_all_defaults`] fills the
//! gaps after load.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration (`config.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMemConfig {
    /// Completion API connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    /// Conversation memory and summarization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryConfig>,

    /// Where chat state is persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Which hosted chat-completion API to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    #[default]
    Github,
    Openai,
}

impl ApiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::Github => "github",
            ApiProvider::Openai => "openai",
        }
    }

    /// Base URL used when `gateway.endpoint` is unset.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ApiProvider::Github => GITHUB_MODELS_ENDPOINT,
            ApiProvider::Openai => OPENAI_ENDPOINT,
        }
    }

    /// Environment variable holding the API key when `gateway.apiKey` is unset.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ApiProvider::Github => "GITHUB_TOKEN",
            ApiProvider::Openai => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(ApiProvider::Github),
            "openai" => Ok(ApiProvider::Openai),
            other => Err(format!("Unknown provider '{other}'. Use 'github' or 'openai'")),
        }
    }
}

pub const GITHUB_MODELS_ENDPOINT: &str = "https://models.inference.ai.azure.com";
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

/// Model preset names accepted in `gateway.model`.
pub const MODEL_PRESET_DEFAULT: &str = "default";
pub const MODEL_PRESET_SMART: &str = "smart";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const SMART_MODEL: &str = "gpt-4";

/// Map a preset name to a model id; anything else is taken as an id.
pub fn resolve_model(preset_or_id: &str) -> &str {
    match preset_or_id {
        MODEL_PRESET_DEFAULT => DEFAULT_MODEL,
        MODEL_PRESET_SMART => SMART_MODEL,
        id => id,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ApiProvider>,
    /// `default`, `smart`, or a model id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Token budget for the context-window view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_messages: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_recent: Option<usize>,
}

// ---------------------------------------------------------------------------
// Storage / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Directory for chat state; defaults to `<config dir>/data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling log files; defaults to `<config dir>/logs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
gateway:
  provider: openai
  model: smart
  maxTokens: 500
memory:
  systemMessage: Be brief.
  summary:
    triggerMessages: 10
storage:
  stateKey: work
"#;
        let cfg: ChatMemConfig = serde_yaml::from_str(yaml).unwrap();
        let gw = cfg.gateway.unwrap();
        assert_eq!(gw.provider, Some(ApiProvider::Openai));
        assert_eq!(gw.max_tokens, Some(500));
        let memory = cfg.memory.unwrap();
        assert_eq!(memory.system_message.as_deref(), Some("Be brief."));
        assert_eq!(memory.summary.unwrap().trigger_messages, Some(10));
        assert_eq!(cfg.storage.unwrap().state_key.as_deref(), Some("work"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let yaml = "gateway:\n  provider: anthropic\n";
        assert!(serde_yaml::from_str::<ChatMemConfig>(yaml).is_err());
        assert!("anthropic".parse::<ApiProvider>().is_err());
        assert_eq!("GitHub".parse::<ApiProvider>().unwrap(), ApiProvider::Github);
    }

    #[test]
    fn model_presets() {
        assert_eq!(resolve_model("default"), "gpt-4o-mini");
        assert_eq!(resolve_model("smart"), "gpt-4");
        assert_eq!(resolve_model("gpt-4o"), "gpt-4o");
    }

    #[test]
    fn empty_config_serializes_to_empty_map() {
        let yaml = serde_yaml::to_string(&ChatMemConfig::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }
}
