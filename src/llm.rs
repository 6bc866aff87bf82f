//! Chat model abstraction
//!
//! The agent talks to a `ChatModel`, not to a vendor SDK; the OpenAI
//! chat-completions implementation lives behind the trait so tests can swap
//! in a scripted model.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::retry::RetryPolicy;
use crate::{Error, Result};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// One message in the model conversation
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Declaration of a callable tool, advertised to the model
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments
    pub parameters: Value,
}

/// One request to the chat model
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// What the model produced: text, tool calls, or both
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Seam between the agent and the model vendor
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion.
    ///
    /// # Errors
    ///
    /// Returns `Error::Model` on vendor-side failure and `Error::Transient`
    /// on retryable transport failures.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatOutcome>;
}

/// OpenAI chat-completions client
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
    policy: RetryPolicy,
}

impl OpenAiChat {
    #[must_use]
    pub fn new(api_key: &str, policy: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            policy,
        }
    }

    fn build_body(request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
        });
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        },
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }

    fn parse_outcome(payload: &Value) -> Result<ChatOutcome> {
        let message = payload
            .pointer("/choices/0/message")
            .ok_or_else(|| Error::Model("completion carried no message".into()))?;
        let text = message
            .get("content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let tool_calls = message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| {
                        let function = call.get("function")?;
                        let name = function.get("name")?.as_str()?.to_string();
                        let arguments = function
                            .get("arguments")
                            .and_then(Value::as_str)
                            .and_then(|raw| serde_json::from_str(raw).ok())
                            .unwrap_or(Value::Null);
                        Some(ToolCall { name, arguments })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(ChatOutcome { text, tool_calls })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        let body = Self::build_body(request);
        let body = &body;
        let payload = self
            .policy
            .run("chat_completion", || async move {
                let response = self
                    .http
                    .post(OPENAI_CHAT_URL)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await?;
                let status = response.status();
                if status.is_server_error() || status.as_u16() == 429 {
                    return Err(Error::Transient(format!("model returned {status}")));
                }
                if !status.is_success() {
                    let detail = response.text().await.unwrap_or_default();
                    return Err(Error::Model(format!("{status}: {detail}")));
                }
                response.json::<Value>().await.map_err(Error::from)
            })
            .await?;
        Self::parse_outcome(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_completion() {
        let payload = json!({
            "choices": [{"message": {"content": "olá!", "tool_calls": null}}]
        });
        let outcome = OpenAiChat::parse_outcome(&payload).unwrap();
        assert_eq!(outcome.text.as_deref(), Some("olá!"));
        assert!(outcome.tool_calls.is_empty());
    }

    #[test]
    fn parses_tool_calls_with_string_arguments() {
        let payload = json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "function": {
                        "name": "schedule_visit",
                        "arguments": "{\"intent\":\"consult\"}"
                    }
                }]
            }}]
        });
        let outcome = OpenAiChat::parse_outcome(&payload).unwrap();
        assert!(outcome.text.is_none());
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].name, "schedule_visit");
        assert_eq!(outcome.tool_calls[0].arguments["intent"], "consult");
    }

    #[test]
    fn missing_message_is_an_error() {
        assert!(OpenAiChat::parse_outcome(&json!({"choices": []})).is_err());
    }
}
