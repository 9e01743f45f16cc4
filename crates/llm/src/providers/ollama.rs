//! Local Ollama chat endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::read_json;
use crate::provider::{CompletionRequest, LlmError, LlmProvider};

pub struct OllamaProvider {
    client: reqwest::Client,
    chat_url: String,
}

impl OllamaProvider {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        let chat_url = format!("{}/api/chat", url.trim_end_matches('/'));
        Self { client, chat_url }
    }
}

fn request_body(request: &CompletionRequest) -> Value {
    json!({
        "model": request.model,
        "messages": request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect::<Vec<_>>(),
        "stream": false,
        "options": {
            "temperature": request.temperature,
            "num_predict": request.max_tokens,
        },
    })
}

fn reply_text(reply: &Value) -> Result<String, LlmError> {
    if let Some(error) = reply["error"].as_str() {
        return Err(LlmError::BadRequest {
            status: 200,
            body: error.to_string(),
        });
    }
    reply["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError("missing message.content".into()))
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(model = %request.model, url = %self.chat_url, "Ollama request");
        let response = self
            .client
            .post(&self.chat_url)
            .json(&request_body(request))
            .send()
            .await?;
        reply_text(&read_json(response).await?)
    }
}
