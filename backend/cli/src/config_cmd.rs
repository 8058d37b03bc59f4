//! CLI config subcommands.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use chatmem_config::{apply_all_defaults, config_file_path, redact, write_config, ChatMemConfig};

use crate::config::Config;
use crate::terminal_output::note_success;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective config with secrets masked
    Show,
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file (a backup is kept)
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

/// Effective config as YAML, secrets masked.
pub fn render_config(settings: &ChatMemConfig) -> Result<String> {
    let value = serde_json::to_value(settings).context("Failed to serialize config")?;
    serde_yaml::to_string(&redact(&value)).context("Failed to render config")
}

/// Also reachable before the config is loaded, so a broken file can be replaced.
pub async fn init(dir: &Path, force: bool) -> Result<()> {
    let path = config_file_path(dir);
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    write_config(&apply_all_defaults(ChatMemConfig::default()), &path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}

pub async fn run(config: &Config, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => print!("{}", render_config(&config.settings)?),
        ConfigCommands::Path => println!("{}", config_file_path(&config.dir).display()),
        ConfigCommands::Init { force } => init(&config.dir, force).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmem_config::schema::GatewayConfig;

    #[test]
    fn show_masks_api_key() {
        let settings = ChatMemConfig {
            gateway: Some(GatewayConfig {
                api_key: Some("sk-live-1234567890".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let out = render_config(&settings).unwrap();
        assert!(out.contains("sk-l***"));
        assert!(!out.contains("1234567890"));
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path(), false).await.unwrap();
        assert!(init(dir.path(), false).await.is_err());
        init(dir.path(), true).await.unwrap();
        let loaded = chatmem_config::load_config(&config_file_path(dir.path())).await.unwrap();
        assert_eq!(loaded, apply_all_defaults(ChatMemConfig::default()));
    }
}
