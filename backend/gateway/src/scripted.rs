use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use chatmem_core::{
    ChatMemError, Completion, CompletionGateway, CompletionRequest, Message, Result, TokenUsage,
};

/// A gateway that plays back canned replies and records what it was sent.
///
/// Replies are consumed in order; once the script runs out, the fallback
/// reply is returned.
pub struct ScriptedGateway {
    name: String,
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: "Scripted response".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = reply.into();
        self
    }

    fn push(&self, entry: std::result::Result<String, String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let content = match next {
            Some(Ok(reply)) => reply,
            Some(Err(message)) => return Err(ChatMemError::gateway(&self.name, Some(500), message)),
            None => self.fallback.clone(),
        };
        Ok(Completion {
            message: Message::assistant(content).stamped(),
            usage: TokenUsage::default(),
            provider: self.name.clone(),
            model: request.model.clone().unwrap_or_else(|| "scripted".to_string()),
            latency_ms: 0,
        })
    }
}
