//! Interactive chat loop over the memory manager.
//!
//! Lines starting with `/` are commands; anything else is sent as a user
//! message. After each exchange the summary policy decides whether memory is
//! condensed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use chatmem_core::{CompletionGateway, CompletionRequest, Message};
use chatmem_logging::{ChatEvent, ChatEventLogger};
use chatmem_memory::{
    format_transcript, parse_edited_memory, MemoryManager, Summarizer, SummaryState,
};

use crate::config::Config;
use crate::terminal_output::{dim, note_error, note_info, note_success};

/// Chat id used for events from the interactive loop.
const REPL_CHAT_ID: &str = "repl";

const HELP: &str = "\
Commands:
  /memory          show the stored messages
  /payload         show what the next request carries
  /toggle          enable or disable memory
  /pause           pause or resume recording
  /clear           reset memory to the system message
  /system <text>   replace the system message
  /summarize       summarize memory now
  /edit <file>     write memory to <file>, or load it back if it exists
                   (Role { } blocks or role: content paragraphs)
  /quit            leave";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Say(String),
    Memory,
    Payload,
    Toggle,
    Pause,
    Clear,
    System(String),
    Summarize,
    Edit(PathBuf),
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ReplCommand::Say(line.to_string())));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let cmd = match name {
        "memory" => ReplCommand::Memory,
        "payload" => ReplCommand::Payload,
        "toggle" => ReplCommand::Toggle,
        "pause" => ReplCommand::Pause,
        "clear" => ReplCommand::Clear,
        "summarize" => ReplCommand::Summarize,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        "system" if !arg.is_empty() => ReplCommand::System(arg.to_string()),
        "edit" if !arg.is_empty() => ReplCommand::Edit(PathBuf::from(arg)),
        "system" | "edit" => bail!("/{name} needs an argument"),
        other => bail!("Unknown command '/{other}'. Type /help"),
    };
    Ok(Some(cmd))
}

/// What the loop should do after a command.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue(String),
    Quit,
}

pub struct ChatRepl {
    memory: MemoryManager,
    summary: SummaryState,
    summarizer: Summarizer,
    gateway: Arc<dyn CompletionGateway>,
}

impl ChatRepl {
    pub fn new(memory: MemoryManager, summarizer: Summarizer, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            memory,
            summary: SummaryState::default(),
            summarizer,
            gateway,
        }
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }

    /// Send one user message with the memory payload and record the exchange.
    pub async fn send(&mut self, text: &str) -> Result<Message> {
        let user = Message::user(text);
        let request = CompletionRequest::new(self.request_messages(user.clone()));
        ChatEventLogger::log_event(
            REPL_CHAT_ID,
            ChatEvent::MessageSent {
                role: user.role.to_string(),
                content: user.content.clone(),
            },
        );

        let completion = match self.gateway.complete(&request).await {
            Ok(completion) => completion,
            Err(e) => {
                ChatEventLogger::log_event(REPL_CHAT_ID, ChatEvent::GatewayFailed { error_msg: e.to_string() });
                return Err(e.into());
            }
        };
        ChatEventLogger::log_event(
            REPL_CHAT_ID,
            ChatEvent::ReplyReceived {
                provider: completion.provider.clone(),
                model: completion.model.clone(),
                latency_ms: completion.latency_ms,
                total_tokens: completion.usage.total_tokens,
            },
        );

        let reply = completion.message;
        self.memory.add_messages([user, reply.clone()]);
        Ok(reply)
    }

    /// Once a summary exists the request carries the system message, the
    /// summary, and the most recent messages instead of the whole memory.
    fn request_messages(&self, user: Message) -> Vec<Message> {
        if !self.memory.is_enabled() || self.summary.is_empty() {
            return self.memory.messages_for_request(user);
        }
        let mut out = Vec::new();
        out.extend(self.memory.messages().first().filter(|m| m.is_system()).cloned());
        out.extend(self.summary.messages_for_request(
            self.memory.messages(),
            user,
            self.summarizer.policy().keep_recent,
        ));
        out
    }

    /// Apply the summary policy. Returns a note when something happened.
    pub async fn after_exchange(&mut self) -> Option<String> {
        match self.summarizer.observe(&mut self.memory, &mut self.summary).await {
            Ok(true) => {
                self.log_summarized();
                Some(format!("Memory summarized into {} points", self.summary.points.len()))
            }
            Ok(false) => None,
            Err(e) => Some(format!("Summary failed: {e}")),
        }
    }

    fn log_summarized(&self) {
        ChatEventLogger::log_event(
            REPL_CHAT_ID,
            ChatEvent::Summarized {
                points: self.summary.points.len(),
                kept_messages: self.memory.conversation_len(),
            },
        );
    }

    pub async fn execute(&mut self, cmd: ReplCommand) -> Result<Flow> {
        let out = match cmd {
            ReplCommand::Say(text) => {
                let reply = self.send(&text).await?;
                let mut out = format!("Assistant: {}", reply.content);
                if let Some(note) = self.after_exchange().await {
                    out.push_str(&format!("\n\n{note}"));
                }
                out
            }
            ReplCommand::Memory => format_transcript(self.memory.messages()),
            ReplCommand::Payload => render_payload(&self.memory),
            ReplCommand::Toggle => {
                self.memory.toggle_memory();
                if self.memory.is_enabled() {
                    "Memory enabled".to_string()
                } else {
                    "Memory disabled; only the system message is sent".to_string()
                }
            }
            ReplCommand::Pause => {
                self.memory.toggle_pause();
                if self.memory.is_paused() {
                    "Memory paused; new messages are not recorded".to_string()
                } else {
                    "Memory resumed".to_string()
                }
            }
            ReplCommand::Clear => {
                self.memory.clear_memory();
                self.summary = SummaryState::default();
                ChatEventLogger::log_event(REPL_CHAT_ID, ChatEvent::MemoryCleared);
                "Memory cleared".to_string()
            }
            ReplCommand::System(text) => {
                self.memory.update_system_message(text);
                "System message updated".to_string()
            }
            ReplCommand::Summarize => {
                self.summarizer
                    .summarize_memory(&mut self.memory, &mut self.summary)
                    .await?;
                self.log_summarized();
                format!("Summary:\n{}", self.summary.points.join("\n"))
            }
            ReplCommand::Edit(path) => self.edit(&path).await?,
            ReplCommand::Help => HELP.to_string(),
            ReplCommand::Quit => return Ok(Flow::Quit),
        };
        Ok(Flow::Continue(out))
    }

    /// Export memory to a new file, or load an edited file back.
    async fn edit(&mut self, path: &std::path::Path) -> Result<String> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tokio::fs::write(path, format_transcript(self.memory.messages()))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            return Ok(format!(
                "Wrote memory to {}; edit it and run /edit again to load it",
                path.display()
            ));
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let messages = parse_edited_memory(&text)?;
        let count = messages.len();
        self.memory.replace_messages(messages);
        info!(path = %path.display(), messages = count, "Loaded edited memory");
        Ok(format!("Loaded {count} messages from {}", path.display()))
    }
}

fn render_payload(memory: &MemoryManager) -> String {
    let payload = memory.payload_breakdown(None);
    let mut out = format!("System: {}\n", payload.system_message.content);
    out.push_str(&format!("Memory ({} messages):", payload.memory_messages.len()));
    for m in &payload.memory_messages {
        out.push_str(&format!("\n  {}: {}", m.role, m.content));
    }
    if !memory.is_enabled() {
        out.push_str("\n(memory disabled)");
    } else if memory.is_paused() {
        out.push_str("\n(memory paused)");
    }
    out
}

pub async fn run(config: &Config, system: Option<String>) -> Result<()> {
    let gateway = config.gateway();
    let summarizer = config.summarizer(gateway.clone());
    let mut repl = ChatRepl::new(config.memory(system.as_deref()), summarizer, gateway);

    note_info("Type a message, or /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                note_error(&e.to_string());
                continue;
            }
        };
        match repl.execute(cmd).await {
            Ok(Flow::Continue(out)) => println!("{out}\n"),
            Ok(Flow::Quit) => break,
            Err(e) => {
                warn!(error = %e, "Chat command failed");
                note_error(&format!("{e:#}"));
            }
        }
    }

    note_success(&format!(
        "Session ended with {} messages in memory",
        repl.memory().conversation_len()
    ));
    println!("{}", dim(&format!("{} summary points", repl.summary().points.len())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmem_core::Role;
    use chatmem_gateway::ScriptedGateway;
    use chatmem_memory::SummaryPolicy;

    fn repl_with(gateway: ScriptedGateway, policy: SummaryPolicy) -> (ChatRepl, Arc<ScriptedGateway>) {
        let gateway = Arc::new(gateway);
        let summarizer = Summarizer::new(gateway.clone()).with_policy(policy);
        let repl = ChatRepl::new(MemoryManager::with_system_prompt("Be terse."), summarizer, gateway.clone());
        (repl, gateway)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("hello").unwrap(), Some(ReplCommand::Say("hello".into())));
        assert_eq!(parse_line("/system  Be kind ").unwrap(), Some(ReplCommand::System("Be kind".into())));
        assert_eq!(parse_line("/edit mem.txt").unwrap(), Some(ReplCommand::Edit("mem.txt".into())));
        assert_eq!(parse_line("/exit").unwrap(), Some(ReplCommand::Quit));
        assert!(parse_line("/system").is_err());
        assert!(parse_line("/bogus").is_err());
    }

    #[tokio::test]
    async fn exchange_is_recorded_and_sent_with_memory() {
        let (mut repl, gateway) = repl_with(
            ScriptedGateway::new("test").with_reply("Hi").with_reply("Still here"),
            SummaryPolicy::default(),
        );
        repl.execute(ReplCommand::Say("hello".into())).await.unwrap();
        repl.execute(ReplCommand::Say("again".into())).await.unwrap();

        assert_eq!(repl.memory().conversation_len(), 4);
        let sent: Vec<_> = gateway.requests()[1].messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(sent, ["Be terse.", "hello", "Hi", "again"]);
    }

    #[tokio::test]
    async fn disabled_memory_sends_only_system_message() {
        let (mut repl, gateway) = repl_with(
            ScriptedGateway::new("test").with_reply("one").with_reply("two"),
            SummaryPolicy::default(),
        );
        repl.execute(ReplCommand::Say("first".into())).await.unwrap();
        repl.execute(ReplCommand::Toggle).await.unwrap();
        repl.execute(ReplCommand::Say("second".into())).await.unwrap();

        let sent = &gateway.requests()[1].messages;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[1].content, "second");
        // nothing recorded while disabled
        assert_eq!(repl.memory().conversation_len(), 2);
    }

    #[tokio::test]
    async fn failed_send_records_nothing() {
        let (mut repl, _gateway) = repl_with(ScriptedGateway::new("test").with_failure("boom"), SummaryPolicy::default());
        assert!(repl.execute(ReplCommand::Say("hello".into())).await.is_err());
        assert_eq!(repl.memory().conversation_len(), 0);
    }

    #[tokio::test]
    async fn policy_triggers_summary_after_exchange() {
        let policy = SummaryPolicy {
            trigger_messages: 4,
            keep_recent: 2,
            ..SummaryPolicy::default()
        };
        let gateway = ScriptedGateway::new("test")
            .with_reply("a1")
            .with_reply("a2")
            .with_reply("- user greeted twice\n- assistant answered");
        let (mut repl, _gateway) = repl_with(gateway, policy);

        repl.execute(ReplCommand::Say("q1".into())).await.unwrap();
        let Flow::Continue(out) = repl.execute(ReplCommand::Say("q2".into())).await.unwrap() else {
            panic!("expected output");
        };
        assert!(out.contains("Memory summarized into 2 points"));
        assert_eq!(repl.summary().points.len(), 2);
        // summary message + two most recent
        assert_eq!(repl.memory().conversation_len(), 3);
    }

    #[tokio::test]
    async fn clear_resets_summary() {
        let (mut repl, _gateway) = repl_with(
            ScriptedGateway::new("test").with_reply("a").with_reply("- point"),
            SummaryPolicy::default(),
        );
        repl.execute(ReplCommand::Say("q".into())).await.unwrap();
        repl.execute(ReplCommand::Summarize).await.unwrap();
        assert!(!repl.summary().is_empty());

        repl.execute(ReplCommand::Clear).await.unwrap();
        assert!(repl.summary().is_empty());
        assert_eq!(repl.memory().messages().len(), 1);
    }

    #[tokio::test]
    async fn edit_writes_then_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.txt");
        let (mut repl, _gateway) = repl_with(ScriptedGateway::new("test").with_reply("Hi"), SummaryPolicy::default());
        repl.execute(ReplCommand::Say("hello".into())).await.unwrap();

        repl.execute(ReplCommand::Edit(path.clone())).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.starts_with("System {\nBe terse.\n}"));

        tokio::fs::write(&path, written.replace("Hi", "Hello there")).await.unwrap();
        repl.execute(ReplCommand::Edit(path)).await.unwrap();
        assert_eq!(repl.memory().messages()[2].content, "Hello there");
    }

    #[tokio::test]
    async fn edit_accepts_plain_role_prefixed_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.txt");
        tokio::fs::write(&path, "user: my name is Ada\n\na: nice to meet you, Ada").await.unwrap();
        let (mut repl, _gateway) = repl_with(ScriptedGateway::new("test"), SummaryPolicy::default());

        repl.execute(ReplCommand::Edit(path)).await.unwrap();
        let messages = repl.memory().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "Be terse.");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].content, "nice to meet you, Ada");
    }

    #[tokio::test]
    async fn requests_after_summary_carry_summary_and_recent_messages() {
        let policy = SummaryPolicy {
            keep_recent: 2,
            ..SummaryPolicy::default()
        };
        let gateway = ScriptedGateway::new("test")
            .with_reply("a1")
            .with_reply("a2")
            .with_reply("- asked twice")
            .with_reply("a3")
            .with_reply("a4");
        let (mut repl, gateway) = repl_with(gateway, policy);
        repl.execute(ReplCommand::Say("q1".into())).await.unwrap();
        repl.execute(ReplCommand::Say("q2".into())).await.unwrap();
        repl.execute(ReplCommand::Summarize).await.unwrap();
        repl.execute(ReplCommand::Say("q3".into())).await.unwrap();
        repl.execute(ReplCommand::Say("q4".into())).await.unwrap();

        let sent: Vec<_> = gateway.requests()[4].messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(
            sent,
            ["Be terse.", "Previous conversation summary:\n- asked twice", "q3", "a3", "q4"]
        );
    }

    #[tokio::test]
    async fn payload_lists_memory() {
        let (mut repl, _gateway) = repl_with(ScriptedGateway::new("test").with_reply("Hi"), SummaryPolicy::default());
        repl.execute(ReplCommand::Say("hello".into())).await.unwrap();
        let Flow::Continue(out) = repl.execute(ReplCommand::Payload).await.unwrap() else {
            panic!("expected output");
        };
        assert!(out.starts_with("System: Be terse."));
        assert!(out.contains("Memory (2 messages):"));
        assert!(out.contains("user: hello"));
    }
}
