//! `chatmem-config`: runtime configuration for chatmem.
//!
//! Provides:
//! - Typed config schema (gateway, memory, storage, logging)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution
//! - Config redaction for safe display
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod resolve;
pub mod schema;
pub mod validation;

pub use schema::{ApiProvider, ChatMemConfig};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use env::{contains_env_var_reference, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use redact::redact;
pub use resolve::{ResolvedGateway, SummarySettings};
pub use defaults::apply_all_defaults;
pub use validation::{validate, validate_with, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, apply env substitution and defaults, and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors are returned; warnings are logged.
pub async fn load_and_prepare(path: &Path) -> Result<ChatMemConfig> {
    let raw_config = load_config(path).await?;

    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: ChatMemConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        return Err(first.into());
    }

    Ok(config)
}
