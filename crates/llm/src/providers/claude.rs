//! Anthropic Messages API.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::read_json;
use crate::provider::{CompletionRequest, LlmError, LlmProvider, Role};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
}

impl ClaudeProvider {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

/// System messages move to the top-level `system` field; the rest stay in order.
fn request_body(request: &CompletionRequest) -> Value {
    let (system, turns): (Vec<_>, Vec<_>) = request
        .messages
        .iter()
        .partition(|m| m.role == Role::System);

    let mut body = json!({
        "model": request.model,
        "messages": turns
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect::<Vec<_>>(),
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if !system.is_empty() {
        let joined: Vec<&str> = system.iter().map(|m| m.content.as_str()).collect();
        body["system"] = json!(joined.join("\n\n"));
    }
    body
}

/// Concatenated text blocks of the reply.
fn reply_text(reply: &Value) -> Result<String, LlmError> {
    let blocks = reply["content"]
        .as_array()
        .ok_or_else(|| LlmError::ParseError("missing content blocks".into()))?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    if text.is_empty() {
        return Err(LlmError::ParseError("reply has no text block".into()));
    }
    Ok(text)
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(model = %request.model, "Anthropic request");
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request_body(request))
            .send()
            .await?;
        reply_text(&read_json(response).await?)
    }
}
