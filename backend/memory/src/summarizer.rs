//! Summary memory: collapse older history into bullet points via the gateway.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use chatmem_core::{CompletionGateway, CompletionRequest, Message, Result, Role};

use crate::manager::MemoryManager;
use crate::types::SummaryState;

/// Header of the synthesized assistant message carrying the summary.
pub const SUMMARY_PREFIX: &str = "Previous conversation summary:";

/// Marker a reply line must start with to count as a summary point.
pub const BULLET_MARKER: char = '-';

const SUMMARY_INSTRUCTIONS: &str = "Please provide a concise bullet-point summary of our \
conversation so far. Each point should capture key information shared. If there's an \
existing summary, keep those points that are still relevant and add new points.";

/// When and how aggressively memory gets summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryPolicy {
    /// Non-system message count at which auto-summarization kicks in.
    pub trigger_messages: usize,
    /// Minimum time between two summaries.
    pub min_interval: Duration,
    /// Non-system messages kept verbatim after summarizing.
    pub keep_recent: usize,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            trigger_messages: 20,
            min_interval: Duration::seconds(30),
            keep_recent: 6,
        }
    }
}

impl SummaryPolicy {
    /// True once enough messages piled up and the last summary is old enough.
    pub fn should_summarize(&self, conversation_len: usize, summary: &SummaryState, now: DateTime<Utc>) -> bool {
        if conversation_len < self.trigger_messages {
            return false;
        }
        match summary.last_updated {
            Some(last) => now - last >= self.min_interval,
            None => true,
        }
    }
}

/// The user message asking the gateway for a bullet summary.
pub fn summary_request(existing_points: &[String]) -> Message {
    let mut content = SUMMARY_INSTRUCTIONS.to_string();
    if !existing_points.is_empty() {
        content.push_str("\n\nExisting summary points:\n");
        content.push_str(&existing_points.join("\n"));
    }
    Message::user(content).stamped()
}

/// Keep the reply lines starting with a bullet marker, trimmed.
///
/// Anything without a marker is dropped; a reply with no bullets yields no points.
pub fn parse_points(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(BULLET_MARKER))
        .map(str::to_string)
        .collect()
}

/// Assistant message presenting the summary as prior context.
pub fn summary_message(points: &[String]) -> Message {
    Message::assistant(format!("{SUMMARY_PREFIX}\n{}", points.join("\n"))).stamped()
}

/// True for the assistant message written by [`summary_message`].
pub fn is_summary_message(message: &Message) -> bool {
    message.role == Role::Assistant && message.content.starts_with(SUMMARY_PREFIX)
}

/// Leading system message, then the summary message, then the last `keep_recent`
/// non-system messages.
pub fn truncate_with_summary(messages: &[Message], points: &[String], keep_recent: usize) -> Vec<Message> {
    let system = messages.first().filter(|m| m.is_system());
    let conversation: Vec<&Message> = messages.iter().filter(|m| !m.is_system()).collect();
    let recent = &conversation[conversation.len().saturating_sub(keep_recent)..];

    let mut out = Vec::with_capacity(recent.len() + 2);
    out.extend(system.cloned());
    out.push(summary_message(points));
    out.extend(recent.iter().map(|m| (*m).clone()));
    out
}

impl SummaryState {
    /// History for the next request: the summary plus recent messages when a
    /// summary exists, otherwise every non-system message; then `current`.
    ///
    /// Summary messages already in `memory` are superseded by the current points.
    pub fn messages_for_request(&self, memory: &[Message], current: Message, keep_recent: usize) -> Vec<Message> {
        let mut out = Vec::new();
        if self.is_empty() {
            out.extend(memory.iter().filter(|m| !m.is_system()).cloned());
        } else {
            let conversation: Vec<&Message> = memory
                .iter()
                .filter(|m| !m.is_system() && !is_summary_message(m))
                .collect();
            out.push(summary_message(&self.points));
            let recent = &conversation[conversation.len().saturating_sub(keep_recent)..];
            out.extend(recent.iter().map(|m| (*m).clone()));
        }
        out.push(current);
        out
    }
}

/// Produces summaries through a completion gateway.
pub struct Summarizer {
    gateway: Arc<dyn CompletionGateway>,
    policy: SummaryPolicy,
}

impl Summarizer {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            gateway,
            policy: SummaryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SummaryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &SummaryPolicy {
        &self.policy
    }

    /// Ask the gateway for a fresh point list covering `recent` and `existing_points`.
    pub async fn summarize(&self, recent: &[Message], existing_points: &[String]) -> Result<SummaryState> {
        let mut messages = recent.to_vec();
        messages.push(summary_request(existing_points));

        let completion = self.gateway.complete(&CompletionRequest::new(messages)).await?;
        let points = parse_points(&completion.message.content);
        if points.is_empty() {
            warn!(
                provider = %completion.provider,
                "Summary reply contained no bullet lines; summary is empty"
            );
        }

        Ok(SummaryState {
            points,
            last_updated: Some(Utc::now()),
        })
    }

    /// Summarize the memory's conversation and replace its history with the
    /// summary plus the most recent messages.
    ///
    /// On gateway failure both `memory` and `summary` are left untouched.
    pub async fn summarize_memory(&self, memory: &mut MemoryManager, summary: &mut SummaryState) -> Result<()> {
        let conversation = memory.conversation();
        let next = match self.summarize(&conversation, &summary.points).await {
            Ok(next) => next,
            Err(e) => {
                error!(error = %e, "Error generating summary");
                return Err(e);
            }
        };

        let truncated = truncate_with_summary(memory.messages(), &next.points, self.policy.keep_recent);
        memory.replace_messages(truncated);
        info!(
            points = next.points.len(),
            retained = memory.conversation_len(),
            "Memory summarized"
        );
        *summary = next;
        Ok(())
    }

    /// Run a summary if the policy says one is due. Returns whether it ran.
    pub async fn observe(&self, memory: &mut MemoryManager, summary: &mut SummaryState) -> Result<bool> {
        if !self.policy.should_summarize(memory.conversation_len(), summary, Utc::now()) {
            return Ok(false);
        }
        self.summarize_memory(memory, summary).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatmem_core::{ChatMemError, Completion, TokenUsage};
    use std::sync::Mutex;

    /// Replies with a fixed text and records every request.
    struct FixedGateway {
        reply: Option<String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedGateway {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionGateway for FixedGateway {
        fn name(&self) -> &str {
            "fixed"
        }

        fn default_model(&self) -> &str {
            "fixed-model"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .reply
                .clone()
                .ok_or_else(|| ChatMemError::gateway("fixed", Some(500), "boom"))?;
            Ok(Completion {
                message: Message::assistant(reply),
                usage: TokenUsage::default(),
                provider: "fixed".into(),
                model: "fixed-model".into(),
                latency_ms: 0,
            })
        }
    }

    fn filled_memory(exchanges: usize) -> MemoryManager {
        let mut memory = MemoryManager::default();
        for i in 0..exchanges {
            memory.add_message(Message::user(format!("question {i}")));
            memory.add_message(Message::assistant(format!("answer {i}")));
        }
        memory
    }

    #[test]
    fn test_parse_points_keeps_bullets_only() {
        let reply = "Here is the summary:\n- User likes Rust\n  - Prefers tokio  \n* not this\nDone.";
        assert_eq!(parse_points(reply), ["- User likes Rust", "- Prefers tokio"]);
    }

    #[test]
    fn test_parse_points_without_bullets_is_empty() {
        assert!(parse_points("Nothing bulleted here.\nStill nothing.").is_empty());
        assert!(parse_points("").is_empty());
    }

    #[test]
    fn test_summary_request_includes_existing_points() {
        let req = summary_request(&[]);
        assert_eq!(req.role, Role::User);
        assert!(!req.content.contains("Existing summary points"));

        let req = summary_request(&["- a".to_string(), "- b".to_string()]);
        assert!(req.content.ends_with("Existing summary points:\n- a\n- b"));
    }

    #[test]
    fn test_truncate_with_summary_layout() {
        let memory = filled_memory(5);
        let points = vec!["- point one".to_string(), "- point two".to_string()];
        let out = truncate_with_summary(memory.messages(), &points, 6);

        assert_eq!(out.len(), 8);
        assert!(out[0].is_system());
        assert_eq!(out[1].role, Role::Assistant);
        assert_eq!(out[1].content, "Previous conversation summary:\n- point one\n- point two");
        let kept: Vec<_> = out[2..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            kept,
            ["question 2", "answer 2", "question 3", "answer 3", "question 4", "answer 4"]
        );
    }

    #[test]
    fn test_truncate_short_history_keeps_everything() {
        let memory = filled_memory(1);
        let out = truncate_with_summary(memory.messages(), &[], 6);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1].content, "Previous conversation summary:\n");
    }

    #[test]
    fn test_policy_thresholds() {
        let policy = SummaryPolicy::default();
        let now = Utc::now();
        let fresh = SummaryState::default();
        assert!(!policy.should_summarize(19, &fresh, now));
        assert!(policy.should_summarize(20, &fresh, now));

        let recent = SummaryState {
            points: vec![],
            last_updated: Some(now - Duration::seconds(10)),
        };
        assert!(!policy.should_summarize(25, &recent, now));

        let stale = SummaryState {
            points: vec![],
            last_updated: Some(now - Duration::seconds(30)),
        };
        assert!(policy.should_summarize(25, &stale, now));
    }

    #[test]
    fn test_messages_for_request_with_and_without_summary() {
        let memory = filled_memory(5);
        let empty = SummaryState::default();
        let out = empty.messages_for_request(memory.messages(), Message::user("next"), 6);
        assert_eq!(out.len(), 11);
        assert!(out.iter().all(|m| !m.is_system()));
        assert_eq!(out.last().unwrap().content, "next");

        let summary = SummaryState {
            points: vec!["- likes tea".into()],
            last_updated: Some(Utc::now()),
        };
        let out = summary.messages_for_request(memory.messages(), Message::user("next"), 6);
        assert_eq!(out.len(), 8);
        assert!(out[0].content.starts_with(SUMMARY_PREFIX));
        assert_eq!(out[1].content, "question 2");
    }

    #[test]
    fn test_messages_for_request_after_truncation_sends_one_summary() {
        let memory = filled_memory(5);
        let old_points = vec!["- old point".to_string()];
        let truncated = truncate_with_summary(memory.messages(), &old_points, 2);
        let summary = SummaryState {
            points: vec!["- new point".into()],
            last_updated: Some(Utc::now()),
        };

        let out = summary.messages_for_request(&truncated, Message::user("next"), 6);
        let contents: Vec<_> = out.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            ["Previous conversation summary:\n- new point", "question 4", "answer 4", "next"]
        );
    }

    #[tokio::test]
    async fn test_summarize_empty_inputs_without_bullets() {
        let gateway = FixedGateway::replying("I could not find anything to summarize.");
        let summarizer = Summarizer::new(gateway.clone());
        let state = summarizer.summarize(&[], &[]).await.unwrap();
        assert!(state.points.is_empty());
        assert!(state.last_updated.is_some());

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_summarize_memory_replaces_history() {
        let gateway = FixedGateway::replying("Summary:\n- asked ten questions\n- got ten answers");
        let summarizer = Summarizer::new(gateway.clone());
        let mut memory = filled_memory(10);
        let mut summary = SummaryState::default();

        summarizer.summarize_memory(&mut memory, &mut summary).await.unwrap();

        assert_eq!(summary.points, ["- asked ten questions", "- got ten answers"]);
        assert_eq!(memory.messages().len(), 8);
        assert!(memory.messages()[0].is_system());
        assert!(memory.messages()[1].content.starts_with(SUMMARY_PREFIX));
        assert_eq!(memory.messages()[7].content, "answer 9");

        // the request carried the conversation without the system message
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].messages.len(), 21);
        assert!(requests[0].messages.iter().all(|m| !m.is_system()));
    }

    #[tokio::test]
    async fn test_second_summary_sends_existing_points() {
        let gateway = FixedGateway::replying("- merged point");
        let summarizer = Summarizer::new(gateway.clone());
        let mut memory = filled_memory(3);
        let mut summary = SummaryState {
            points: vec!["- earlier point".into()],
            last_updated: None,
        };
        summarizer.summarize_memory(&mut memory, &mut summary).await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        let ask = requests[0].messages.last().unwrap();
        assert!(ask.content.contains("- earlier point"));
        assert_eq!(summary.points, ["- merged point"]);
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_state_untouched() {
        let summarizer = Summarizer::new(FixedGateway::failing());
        let mut memory = filled_memory(10);
        let before = memory.messages().to_vec();
        let mut summary = SummaryState::default();

        let result = summarizer.summarize_memory(&mut memory, &mut summary).await;
        assert!(result.is_err());
        assert_eq!(memory.messages(), before.as_slice());
        assert_eq!(summary, SummaryState::default());
    }

    #[tokio::test]
    async fn test_observe_respects_policy() {
        let gateway = FixedGateway::replying("- ok");
        let summarizer = Summarizer::new(gateway.clone());
        let mut summary = SummaryState::default();

        let mut small = filled_memory(9);
        assert!(!summarizer.observe(&mut small, &mut summary).await.unwrap());
        assert!(gateway.requests.lock().unwrap().is_empty());

        let mut large = filled_memory(10);
        assert!(summarizer.observe(&mut large, &mut summary).await.unwrap());
        // just summarized: the interval blocks an immediate second run
        for i in 0..20 {
            large.add_message(Message::user(format!("more {i}")));
        }
        assert!(!summarizer.observe(&mut large, &mut summary).await.unwrap());
    }
}
