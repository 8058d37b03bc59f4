//! Config validation: field checks with user-friendly error messages.

use crate::schema::ChatMemConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate the config against the process environment.
pub fn validate(config: &ChatMemConfig) -> ValidationReport {
    validate_with(config, |name| std::env::var(name).ok())
}

/// Validate the config, looking up API key variables through `env`.
pub fn validate_with(config: &ChatMemConfig, env: impl Fn(&str) -> Option<String>) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_gateway(config, &env, &mut report);
    validate_memory(config, &mut report);
    validate_storage(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_gateway(
    config: &ChatMemConfig,
    env: &impl Fn(&str) -> Option<String>,
    report: &mut ValidationReport,
) {
    let gw = config.gateway.clone().unwrap_or_default();

    if let Some(t) = gw.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("gateway.temperature", format!("temperature {t} must be between 0 and 2"));
        }
    }
    if gw.max_tokens == Some(0) {
        report.error("gateway.maxTokens", "maxTokens must be >= 1");
    }
    if let Some(model) = &gw.model {
        if model.trim().is_empty() {
            report.error("gateway.model", "Model cannot be empty; use 'default', 'smart', or a model id");
        }
    }
    if let Some(endpoint) = &gw.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            report.error("gateway.endpoint", format!("Endpoint '{endpoint}' must be an http(s) URL"));
        }
    }

    let provider = gw.provider.unwrap_or_default();
    match gw.api_key.as_deref() {
        Some(key) if key.trim().is_empty() => {
            report.error("gateway.apiKey", "apiKey is set but empty");
        }
        Some(_) => {}
        None => {
            let var = provider.api_key_env();
            if env(var).map(|v| v.is_empty()).unwrap_or(true) {
                report.warn(
                    "gateway.apiKey",
                    format!("No apiKey configured and {var} is not set; requests to {provider} will fail"),
                );
            }
        }
    }
}

fn validate_memory(config: &ChatMemConfig, report: &mut ValidationReport) {
    let Some(memory) = &config.memory else { return };
    if memory.token_limit == Some(0) {
        report.error("memory.tokenLimit", "tokenLimit must be >= 1");
    }
    let Some(summary) = &memory.summary else { return };
    if summary.trigger_messages == Some(0) {
        report.error("memory.summary.triggerMessages", "triggerMessages must be >= 1");
    }
    if let (Some(trigger), Some(keep)) = (summary.trigger_messages, summary.keep_recent) {
        if keep >= trigger {
            report.warn(
                "memory.summary.keepRecent",
                format!("keepRecent ({keep}) >= triggerMessages ({trigger}); summaries will not shorten memory"),
            );
        }
    }
}

fn validate_storage(config: &ChatMemConfig, report: &mut ValidationReport) {
    let Some(storage) = &config.storage else { return };
    if let Some(key) = &storage.state_key {
        if key.trim().is_empty() {
            report.error("storage.stateKey", "stateKey cannot be empty");
        } else if key.contains(['/', '\\']) {
            report.error("storage.stateKey", "stateKey cannot contain path separators");
        }
    }
}

fn validate_logging(config: &ChatMemConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.warn(
            "logging.level",
            format!("Unknown log level '{level}'; expected one of {}", LOG_LEVELS.join(", ")),
        );
    }
}
