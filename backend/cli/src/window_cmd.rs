//! `context-window`: show which trailing words of a text fit the token budget.

use anyhow::Result;
use tokio::io::AsyncReadExt;

use crate::config::Config;
use crate::terminal_output::{render_context_window, supports_color};

/// Analyse `words` joined by spaces, or stdin when no words are given.
pub async fn run(config: &Config, limit: Option<usize>, words: Vec<String>) -> Result<()> {
    let text = if words.is_empty() {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        words.join(" ")
    };

    let window = config.context_window(limit);
    let report = window.analyze(&text);
    println!("{}", render_context_window(&report, supports_color()));
    Ok(())
}
