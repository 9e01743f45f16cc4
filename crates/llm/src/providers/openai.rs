//! OpenAI-compatible chat completions (also serves self-hosted gateways via
//! `OPENAI_BASE_URL`).

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::read_json;
use crate::provider::{CompletionRequest, LlmError, LlmProvider};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        let endpoint = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        Self {
            client,
            api_key,
            endpoint,
        }
    }
}

fn request_body(request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();
    json!({
        "model": request.model,
        "messages": messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    })
}

fn reply_text(reply: &Value) -> Result<String, LlmError> {
    reply["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(model = %request.model, endpoint = %self.endpoint, "OpenAI request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body(request))
            .send()
            .await?;
        reply_text(&read_json(response).await?)
    }
}
