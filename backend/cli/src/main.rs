mod chat_cmd;
mod chats_cmd;
mod config;
mod config_cmd;
mod notebook_cmd;
mod terminal_output;
mod window_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use chats_cmd::ChatsCommands;
use config::Config;
use config_cmd::ConfigCommands;
use notebook_cmd::NotebookCommands;
use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "chatmem")]
#[command(about = "chatmem: chat with an LLM through editable, summarizing memory")]
#[command(version)]
struct Cli {
    /// Config directory (defaults to $CHATMEM_CONFIG_DIR or ~/.chatmem)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Show info-level logs on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat with memory controls
    Chat {
        /// System message for this session
        #[arg(long)]
        system: Option<String>,
    },
    /// Send one message in the current saved conversation
    Send {
        text: String,
        /// Keep the message out of the conversation history
        #[arg(long)]
        hide: bool,
    },
    /// Manage saved conversations
    #[command(subcommand)]
    Chats(ChatsCommands),
    /// Show which trailing words fit the token budget
    ContextWindow {
        #[arg(short, long)]
        limit: Option<usize>,
        /// Text to analyse; read from stdin when omitted
        words: Vec<String>,
    },
    /// Export a conversation to a JSON file
    Export {
        /// Chat id or unique id prefix
        id: String,
        /// Destination file or directory (defaults to the current directory)
        dest: Option<PathBuf>,
    },
    /// Import a conversation from a JSON export
    Import { file: PathBuf },
    /// The current conversation's notebook
    #[command(subcommand)]
    Notebook(NotebookCommands),
    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        error!(error = %e, "Command failed");
        note_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = cli.config_dir.unwrap_or_else(chatmem_config::config_dir);

    if let Commands::Config(ConfigCommands::Init { force }) = cli.command {
        return config_cmd::init(&dir, force).await;
    }

    let config = Config::load(Some(dir)).await?;
    config.init_logging(cli.verbose);

    match cli.command {
        Commands::Chat { system } => chat_cmd::run(&config, system).await,
        Commands::Send { text, hide } => chats_cmd::send(&config, &text, hide).await,
        Commands::Chats(cmd) => chats_cmd::run(&config, cmd).await,
        Commands::ContextWindow { limit, words } => window_cmd::run(&config, limit, words).await,
        Commands::Export { id, dest } => chats_cmd::export(&config, &id, dest).await,
        Commands::Import { file } => chats_cmd::import(&config, &file).await,
        Commands::Notebook(cmd) => notebook_cmd::run(&config, cmd).await,
        Commands::Config(cmd) => config_cmd::run(&config, cmd).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_context_window_args() {
        let cli = Cli::parse_from(["chatmem", "context-window", "--limit", "4", "a", "b", "c"]);
        match cli.command {
            Commands::ContextWindow { limit, words } => {
                assert_eq!(limit, Some(4));
                assert_eq!(words, ["a", "b", "c"]);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn parses_global_config_dir_after_subcommand() {
        let cli = Cli::parse_from(["chatmem", "chats", "list", "--config-dir", "/tmp/cm"]);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cm")));
        assert!(matches!(cli.command, Commands::Chats(ChatsCommands::List)));
    }

    #[test]
    fn parses_chats_edit() {
        let cli = Cli::parse_from(["chatmem", "chats", "edit", "ab12", "notes.txt"]);
        match cli.command {
            Commands::Chats(ChatsCommands::Edit { id, file }) => {
                assert_eq!(id, "ab12");
                assert_eq!(file, PathBuf::from("notes.txt"));
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
