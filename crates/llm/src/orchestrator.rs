use std::sync::Arc;

use chrono::Utc;
use study_compute::algorithms::difficulty::{MAX_QUESTIONS, MIN_QUESTIONS};
use study_core::config::{CacheConfig, LlmConfig, RetryConfig};
use study_core::{
    AiResult, Caller, ExtractedContent, ExtractionStatus, FileId, Fingerprint, KnowledgeLevel,
    ResultStore,
};
use tracing::{info, warn};

use crate::cache::{CacheStats, ResultCache};
use crate::error::AiError;
use crate::fingerprint::FingerprintBuilder;
use crate::prompts::{self, ConversationContext, StudyContext};
use crate::provider::{CompletionRequest, LlmProvider, Message};
use crate::response::{truncate_for_log, AiPayload, ChatReply, FileAnalysis, Quiz, StudyGuide};
use crate::retry::{complete_with_retry, RateGate, RetryPolicy};

/// Characters of a malformed response kept in the warning log.
const RAW_LOG_CHARS: usize = 500;

/// A parsed answer together with the stored record it came from.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub value: T,
    pub record: AiResult,
}

impl<T> Generated<T> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.record.fingerprint
    }
}

/// Turns study requests into cached, retried, parsed language-model calls.
///
/// Every operation fingerprints its request, serves repeats from the
/// [`ResultCache`], and on a miss runs one provider call (coalescing
/// concurrent identical requests) whose parsed result is written to the
/// result store before it is cached.
pub struct AiOrchestrator {
    client: Arc<dyn LlmProvider>,
    llm: LlmConfig,
    cache_config: CacheConfig,
    retry: RetryPolicy,
    gate: RateGate,
    cache: ResultCache,
    store: Arc<dyn ResultStore>,
}

/// Everything one provider call needs, owned so it can run detached.
struct PreparedCall {
    caller: Caller,
    fingerprint: Fingerprint,
    request: CompletionRequest,
    file_id: Option<FileId>,
}

impl AiOrchestrator {
    pub fn new(
        client: Arc<dyn LlmProvider>,
        llm: LlmConfig,
        retry: &RetryConfig,
        cache_config: CacheConfig,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            gate: RateGate::new(llm.max_concurrent_calls),
            cache: ResultCache::new(cache_config.capacity),
            retry: RetryPolicy::from_config(retry),
            client,
            llm,
            cache_config,
            store,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn generate_study_guide(
        &self,
        caller: Caller,
        prompt: &str,
        ctx: &StudyContext,
    ) -> Result<Generated<StudyGuide>, AiError> {
        require_text(prompt, "prompt")?;
        let model = self.model_for(caller);
        let fingerprint = FingerprintBuilder::new(StudyGuide::KIND, caller, &model, prompt)
            .contexts(ctx.context_ids())
            .param("subject", ctx.subject.as_deref().unwrap_or(""))
            .build();
        let messages = prompts::study_guide(prompt, ctx);
        let call = self.prepare(caller, fingerprint, model, messages, None);
        self.run(call).await
    }

    /// `length` is clamped into the supported quiz size range.
    pub async fn generate_quiz(
        &self,
        caller: Caller,
        prompt: &str,
        ctx: &StudyContext,
        level: KnowledgeLevel,
        length: u32,
    ) -> Result<Generated<Quiz>, AiError> {
        require_text(prompt, "prompt")?;
        let length = length.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
        let model = self.model_for(caller);
        let fingerprint = FingerprintBuilder::new(Quiz::KIND, caller, &model, prompt)
            .contexts(ctx.context_ids())
            .param("subject", ctx.subject.as_deref().unwrap_or(""))
            .param("level", level)
            .param("length", length)
            .build();
        let messages = prompts::quiz(prompt, ctx, level, length);
        let call = self.prepare(caller, fingerprint, model, messages, None);
        self.run(call).await
    }

    pub async fn chat(
        &self,
        caller: Caller,
        message: &str,
        ctx: &ConversationContext,
    ) -> Result<Generated<ChatReply>, AiError> {
        require_text(message, "message")?;
        let model = self.model_for(caller);
        let fingerprint = FingerprintBuilder::new(ChatReply::KIND, caller, &model, message)
            .contexts(ctx.context_ids())
            .build();
        let call = self.prepare(caller, fingerprint, model, prompts::chat(message, ctx), None);
        self.run(call).await
    }

    /// Analyze normalized content. The stored result is keyed by the source
    /// file so it can be fetched with `get_analysis_result_by_file_id`.
    pub async fn analyze_file(
        &self,
        caller: Caller,
        content: &ExtractedContent,
        subject: &str,
        level: KnowledgeLevel,
    ) -> Result<Generated<FileAnalysis>, AiError> {
        if content.extraction_status == ExtractionStatus::Failed {
            return Err(AiError::Validation(format!(
                "file {} failed extraction and cannot be analyzed",
                content.source_file_id
            )));
        }
        require_text(&content.raw_text, "file text")?;
        require_text(subject, "subject")?;

        let model = self.model_for(caller);
        let fingerprint =
            FingerprintBuilder::new(FileAnalysis::KIND, caller, &model, &content.raw_text)
                .context(format!("file:{}", content.source_file_id))
                .param("subject", subject.trim())
                .param("level", level)
                .build();
        let messages = prompts::file_analysis(&content.raw_text, subject.trim(), level);
        let call = self.prepare(
            caller,
            fingerprint,
            model,
            messages,
            Some(content.source_file_id),
        );
        self.run(call).await
    }

    fn model_for(&self, caller: Caller) -> String {
        self.llm.model_for(caller.is_guest()).to_string()
    }

    fn prepare(
        &self,
        caller: Caller,
        fingerprint: Fingerprint,
        model: String,
        messages: Vec<Message>,
        file_id: Option<FileId>,
    ) -> PreparedCall {
        PreparedCall {
            caller,
            fingerprint,
            request: CompletionRequest {
                model,
                messages,
                temperature: self.llm.temperature,
                max_tokens: self.llm.max_tokens,
            },
            file_id,
        }
    }

    async fn run<T: AiPayload>(&self, call: PreparedCall) -> Result<Generated<T>, AiError> {
        let fingerprint = call.fingerprint.clone();
        let ttl = self.cache_config.ttl_for(T::KIND);

        let client = Arc::clone(&self.client);
        let store = Arc::clone(&self.store);
        let gate = self.gate.clone();
        let retry = self.retry.clone();

        let record = self
            .cache
            .get_or_compute(&fingerprint, ttl, move || async move {
                let raw = complete_with_retry(client.as_ref(), &gate, &retry, &call.request).await?;
                let value = T::parse(&raw).map_err(|reason| {
                    warn!(
                        kind = %T::KIND,
                        fingerprint = call.fingerprint.short(),
                        reason = %reason,
                        raw = %truncate_for_log(&raw, RAW_LOG_CHARS),
                        "malformed AI response"
                    );
                    AiError::ResponseParse {
                        kind: T::KIND,
                        reason,
                    }
                })?;
                let record = AiResult {
                    operation_kind: T::KIND,
                    fingerprint: call.fingerprint.clone(),
                    result_payload: serde_json::to_value(&value).map_err(|e| {
                        AiError::ResponseParse {
                            kind: T::KIND,
                            reason: e.to_string(),
                        }
                    })?,
                    file_id: call.file_id,
                    model: call.request.model.clone(),
                    confidence: value.confidence(),
                    created_at: Utc::now(),
                };
                store.save_analysis_result(&record).await?;
                info!(
                    kind = %T::KIND,
                    fingerprint = call.fingerprint.short(),
                    model = %record.model,
                    guest = call.caller.is_guest(),
                    "AI result stored"
                );
                Ok(record)
            })
            .await?;

        let value = serde_json::from_value(record.result_payload.clone()).map_err(|e| {
            AiError::ResponseParse {
                kind: T::KIND,
                reason: format!("cached payload: {e}"),
            }
        })?;
        Ok(Generated { value, record })
    }
}

fn require_text(value: &str, what: &str) -> Result<(), AiError> {
    if value.trim().is_empty() {
        return Err(AiError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}
