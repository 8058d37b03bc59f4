//! CLI notebook subcommands: the current conversation's collab space.

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;
use crate::terminal_output::{note_info, note_success};

#[derive(Subcommand)]
pub enum NotebookCommands {
    /// Print the notebook
    Show,
    /// Distill the last assistant reply into a new bullet
    Add,
    /// Replace the notebook text
    Set { text: String },
}

pub async fn run(config: &Config, cmd: NotebookCommands) -> Result<()> {
    let mut session = config.session().await?;
    match cmd {
        NotebookCommands::Show => {
            let content = session
                .current_chat()
                .map(|c| c.collab_space.as_str())
                .unwrap_or_default();
            if content.is_empty() {
                note_info("Notebook is empty.");
            } else {
                print!("{content}");
            }
        }
        NotebookCommands::Add => match session.add_notebook_point().await? {
            Some(item) => note_success(&format!("Added {}", item.trim_end())),
            None => note_info("No assistant reply to add yet."),
        },
        NotebookCommands::Set { text } => {
            session.update_collab_space(&text).await?;
            note_success("Notebook updated");
        }
    }
    Ok(())
}
