use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use chatmem_core::{
    ChatMemError, Completion, CompletionGateway, CompletionRequest, Message, Result, Role,
    TokenUsage,
};

/// Everything needed to talk to one OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Provider label used in logs and errors (e.g., "openai", "github").
    pub provider: String,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Chat-completion gateway for OpenAI and API-compatible hosts (GitHub Models).
pub struct OpenAiCompatGateway {
    client: Client,
    settings: GatewaySettings,
}

impl OpenAiCompatGateway {
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: request.model.as_deref().unwrap_or(&self.settings.model),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    role: Option<Role>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Pull a readable message out of an error body.
///
/// Handles `{"error": {"message": ..}}`, `{"error": ".."}`, and plain text.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match value.get("error") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(err) => err
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
        None => body.trim().to_string(),
    }
}

fn into_completion(
    response: ChatResponse,
    provider: &str,
    requested_model: &str,
    latency_ms: u64,
) -> Result<Completion> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ChatMemError::EmptyResponse)?;

    let message = Message::new(
        choice.message.role.unwrap_or(Role::Assistant),
        choice.message.content.unwrap_or_default(),
    )
    .stamped();

    let usage = response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(Completion {
        message,
        usage,
        provider: provider.to_string(),
        model: response.model.unwrap_or_else(|| requested_model.to_string()),
        latency_ms,
    })
}

#[async_trait]
impl CompletionGateway for OpenAiCompatGateway {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    fn default_model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let start = Instant::now();
        let body = self.build_body(request);
        let provider = self.settings.provider.as_str();

        debug!(
            provider,
            model = body.model,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let mut http = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.settings.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| {
            error!(provider, error = %e, "Completion request failed");
            ChatMemError::gateway(provider, e.status().map(|s| s.as_u16()), e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = error_message(&error_body);
            error!(provider, status = status.as_u16(), %message, "Completion gateway returned an error");
            return Err(ChatMemError::gateway(provider, Some(status.as_u16()), message));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            ChatMemError::gateway(provider, None, format!("failed to parse response: {e}"))
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let completion = into_completion(chat_response, provider, body.model, latency_ms)?;
        debug!(
            provider,
            model = %completion.model,
            total_tokens = completion.usage.total_tokens,
            latency_ms,
            "Received chat completion"
        );
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> OpenAiCompatGateway {
        OpenAiCompatGateway::new(GatewaySettings {
            provider: "github".into(),
            base_url: "https://models.inference.ai.azure.com/".into(),
            api_key: Some("token".into()),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 1000,
        })
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        assert_eq!(
            gateway().endpoint(),
            "https://models.inference.ai.azure.com/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let gw = gateway();
        let request = CompletionRequest::new(vec![
            Message::system("Be helpful.").stamped(),
            Message::user("Hi"),
        ]);
        let body = serde_json::to_value(gw.build_body(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "Be helpful." },
                    { "role": "user", "content": "Hi" }
                ],
                "temperature": 0.7f32,
                "max_tokens": 1000
            })
        );
    }

    #[test]
    fn test_request_model_override() {
        let gw = gateway();
        let request = CompletionRequest::new(vec![Message::user("Hi")]).with_model("gpt-4");
        assert_eq!(gw.build_body(&request).model, "gpt-4");
    }

    #[test]
    fn test_parse_completion() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Hello!" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let completion = into_completion(response, "openai", "gpt-4o-mini", 42).unwrap();
        assert_eq!(completion.message.role, Role::Assistant);
        assert_eq!(completion.message.content, "Hello!");
        assert!(completion.message.timestamp.is_some());
        assert_eq!(completion.usage.total_tokens, 15);
        assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(completion.latency_ms, 42);
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{ "choices": [] }"#).unwrap();
        let err = into_completion(response, "openai", "gpt-4o-mini", 0).unwrap_err();
        assert!(matches!(err, ChatMemError::EmptyResponse));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error"}}"#),
            "Incorrect API key"
        );
        assert_eq!(error_message(r#"{"error":"Messages are required"}"#), "Messages are required");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }
}
