pub mod claude;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use study_core::config::LlmConfig;
use tracing::info;

use crate::provider::{LlmError, LlmProvider};

/// Create the LLM client selected by config.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| LlmError::NotConfigured(format!("failed to build HTTP client: {e}")))?;

    let client: Arc<dyn LlmProvider> = match config.provider.as_str() {
        "openai" => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com");
            Arc::new(openai::OpenAiProvider::new(
                http,
                api_key.clone(),
                base_url.to_string(),
            ))
        }
        "anthropic" | "claude" => {
            let api_key = config
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Arc::new(claude::ClaudeProvider::new(http, api_key.clone()))
        }
        "ollama" => Arc::new(ollama::OllamaProvider::new(http, config.ollama_url.clone())),
        other => {
            return Err(LlmError::NotConfigured(format!(
                "unknown LLM provider: '{}'",
                other
            )))
        }
    };

    info!(
        provider = client.name(),
        guest_model = %config.guest_model,
        member_model = %config.member_model,
        "LLM client ready"
    );
    Ok(client)
}

/// Parse a JSON body, classifying non-200 statuses.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::from_status(status, body));
    }
    Ok(response.json().await?)
}
