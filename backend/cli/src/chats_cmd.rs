//! CLI chat subcommands: manage saved conversations and send messages.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use chatmem_chat::{export, ChatSession, ChatState};
use chatmem_core::{Chat, MessageStatus};
use chatmem_memory::{format_transcript, parse_edited_memory};

use crate::config::Config;
use crate::terminal_output::{dim, note_info, note_success, note_warn, render_table};

#[derive(Subcommand)]
pub enum ChatsCommands {
    /// List saved conversations
    List,
    /// Start a new conversation and make it current
    New,
    /// Switch the current conversation
    Use {
        /// Chat id or unique id prefix
        id: String,
    },
    /// Rename a conversation
    Rename { id: String, title: String },
    /// Show a conversation's messages (current one by default)
    Show { id: Option<String> },
    /// Remove everything except assistant replies from a conversation
    Hide { id: String },
    /// Write a conversation's messages to <file>, or load an edited <file> back
    Edit { id: String, file: PathBuf },
    /// Delete every conversation
    Clear {
        /// Required; clearing cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

/// Find a chat by exact id, or by a prefix matching exactly one chat.
pub fn resolve_chat_id(state: &ChatState, id_or_prefix: &str) -> Result<String> {
    if state.chat(id_or_prefix).is_some() {
        return Ok(id_or_prefix.to_string());
    }
    let matches: Vec<&Chat> = state
        .chats
        .iter()
        .filter(|c| c.id.starts_with(id_or_prefix))
        .collect();
    match matches.as_slice() {
        [chat] => Ok(chat.id.clone()),
        [] => bail!("No chat matches '{id_or_prefix}'"),
        _ => bail!("'{id_or_prefix}' matches {} chats; use more characters", matches.len()),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn render_chat_list(state: &ChatState) -> String {
    let rows: Vec<Vec<String>> = state
        .chats
        .iter()
        .map(|c| {
            let marker = if state.current_chat_id.as_deref() == Some(c.id.as_str()) { "*" } else { "" };
            vec![
                marker.to_string(),
                short_id(&c.id).to_string(),
                c.title.clone(),
                c.messages.len().to_string(),
                c.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    render_table(&["", "ID", "Title", "Messages", "Updated"], &rows)
}

pub fn render_chat(chat: &Chat) -> String {
    let mut out = format!("{} ({})\n", chat.title, chat.id);
    for m in &chat.messages {
        let status = match m.status {
            MessageStatus::Confirmed => "",
            MessageStatus::Pending => " [pending]",
            MessageStatus::Failed => " [failed]",
        };
        out.push_str(&format!("\n{}{status}: {}\n", m.role.display_name(), m.content));
    }
    out
}

pub async fn run(config: &Config, cmd: ChatsCommands) -> Result<()> {
    let mut session = config.session().await?;
    match cmd {
        ChatsCommands::List => {
            if session.state().chats.is_empty() {
                note_info("No chats yet. Start one with `chatmem chats new`.");
            } else {
                print!("{}", render_chat_list(session.state()));
            }
        }
        ChatsCommands::New => {
            let id = session.new_chat().await?;
            note_success(&format!("Created chat {}", short_id(&id)));
        }
        ChatsCommands::Use { id } => {
            let id = resolve_chat_id(session.state(), &id)?;
            session.use_chat(&id).await?;
            note_success(&format!("Switched to chat {}", short_id(&id)));
        }
        ChatsCommands::Rename { id, title } => {
            let id = resolve_chat_id(session.state(), &id)?;
            session.rename_chat(&id, &title).await?;
            note_success(&format!("Renamed chat {} to '{title}'", short_id(&id)));
        }
        ChatsCommands::Show { id } => {
            let chat = match id {
                Some(id) => {
                    let id = resolve_chat_id(session.state(), &id)?;
                    session.state().chat(&id).cloned()
                }
                None => session.current_chat().cloned(),
            };
            match chat {
                Some(chat) => print!("{}", render_chat(&chat)),
                None => note_info("No current chat."),
            }
        }
        ChatsCommands::Hide { id } => {
            let id = resolve_chat_id(session.state(), &id)?;
            session.hide_user_messages(&id).await?;
            note_success("Removed user messages");
        }
        ChatsCommands::Edit { id, file } => {
            let id = resolve_chat_id(session.state(), &id)?;
            let note = edit_chat(&mut session, &id, &file).await?;
            note_success(&note);
        }
        ChatsCommands::Clear { yes } => {
            if !yes {
                note_warn("This deletes every chat. Re-run with --yes to confirm.");
                return Ok(());
            }
            session.clear_all().await?;
            note_success("All chats cleared");
        }
    }
    Ok(())
}

/// Write the conversation as a transcript when `path` does not exist yet,
/// otherwise replace its messages with the edited file. System blocks are
/// dropped on load.
pub async fn edit_chat(session: &mut ChatSession, id: &str, path: &Path) -> Result<String> {
    let chat = session.state().chat(id).with_context(|| format!("No chat '{id}'"))?;
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tokio::fs::write(path, format_transcript(&chat.messages))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(format!(
            "Wrote chat {} to {}; edit it and run the command again to load it",
            short_id(id),
            path.display()
        ));
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let messages: Vec<_> = parse_edited_memory(&text)?
        .into_iter()
        .filter(|m| !m.is_system())
        .collect();
    let count = messages.len();
    session.update_chat_messages(id, messages).await?;
    Ok(format!("Loaded {count} messages into chat {}", short_id(id)))
}

/// Send one message in the current conversation, creating one if needed.
pub async fn send(config: &Config, text: &str, hide_user_message: bool) -> Result<()> {
    let mut session = config.session().await?;
    if session.current_chat().is_none() {
        session.new_chat().await?;
    }
    let reply = session.send_message(text, hide_user_message).await?;
    println!("{}", reply.content);
    Ok(())
}

/// Write a conversation's export file. `dest` may be a directory or a file path.
pub async fn export(config: &Config, id: &str, dest: Option<PathBuf>) -> Result<()> {
    let session = config.session().await?;
    let id = resolve_chat_id(session.state(), id)?;
    let dest = dest.unwrap_or_else(|| PathBuf::from("."));

    let path = if dest.is_dir() {
        let chat = session
            .state()
            .chat(&id)
            .context("chat disappeared while exporting")?;
        export::export_to_dir(chat, &dest).await?
    } else {
        tokio::fs::write(&dest, session.export_chat(&id)?)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        dest
    };
    note_success(&format!("Exported chat to {}", path.display()));
    Ok(())
}

pub async fn import(config: &Config, file: &Path) -> Result<()> {
    let mut session = config.session().await?;
    let chat = export::import_from_file(file).await?;
    let title = chat.title.clone();
    let id = session.import_chat(chat).await?;
    note_success(&format!("Imported '{title}' as {}", short_id(&id)));
    println!("{}", dim("It is now the current chat."));
    Ok(())
}
