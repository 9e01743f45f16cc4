use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use study_core::config::{CacheConfig, LlmConfig, RetryConfig};
use study_core::{ExtractedContent, ExtractionStatus, FileId, MemoryResultStore, Metadata};
use study_llm::{AiOrchestrator, CompletionRequest, LlmError, LlmProvider};

pub const GUIDE_JSON: &str = r#"{"feedback": {"summary": "Good grasp of limits", "strengths": ["limits"], "weaknesses": ["chain rule"]},
"study_plan": {"title": "Derivatives", "steps": [{"topic": "Chain rule", "description": "Practice", "duration_minutes": 20}]}}"#;

pub const QUIZ_JSON: &str = r#"```json
{"title": "Derivatives", "questions": [
  {"question": "d/dx x^2?", "options": ["x", "2x"], "answer": "2x", "explanation": "Power rule", "difficulty": 2}
]}
```"#;

pub const ANALYSIS_JSON: &str = r#"{"summary": "Introductory cell biology", "key_topics": ["mitosis"],
"difficulty": 2, "recommendations": ["Review diagrams"], "confidence": 0.8}"#;

/// Provider that replays scripted outcomes, then falls back to a fixed reply.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: String,
    delay: Duration,
    calls: AtomicUsize,
    panics_left: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    started_at: Mutex<Vec<Instant>>,
    models: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn replying(fallback: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            panics_left: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started_at: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Outcomes returned, in order, before the fallback.
    pub fn then(self, outcome: Result<&str, LlmError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(outcome.map(str::to_string));
        self
    }

    /// Panic inside `complete` on the first `times` calls.
    pub fn panicking(self, times: usize) -> Self {
        self.panics_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    /// Most `complete` calls that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// When each call reached the provider, in arrival order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.started_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started_at.lock().unwrap().push(Instant::now());
        let panics = self
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if panics.is_ok() {
            panic!("provider crashed");
        }
        self.models.lock().unwrap().push(request.model.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay_ms: 5,
        backoff_factor: 2.0,
        max_delay_ms: 20,
        jitter: true,
    }
}

pub fn llm_config() -> LlmConfig {
    LlmConfig {
        guest_model: "guest-tier".into(),
        member_model: "member-tier".into(),
        ..LlmConfig::default()
    }
}

pub fn make_orchestrator(
    client: Arc<ScriptedClient>,
) -> (AiOrchestrator, Arc<MemoryResultStore>) {
    make_orchestrator_with(client, llm_config(), fast_retry())
}

pub fn make_orchestrator_with(
    client: Arc<dyn LlmProvider>,
    llm: LlmConfig,
    retry: RetryConfig,
) -> (AiOrchestrator, Arc<MemoryResultStore>) {
    let store = Arc::new(MemoryResultStore::new());
    let orchestrator =
        AiOrchestrator::new(client, llm, &retry, CacheConfig::default(), store.clone());
    (orchestrator, store)
}

pub fn content(file_id: FileId, text: &str) -> ExtractedContent {
    ExtractedContent {
        source_file_id: file_id,
        raw_text: text.to_string(),
        token_count: text.split_whitespace().count(),
        extracted_assets: Vec::new(),
        metadata: Metadata::new(),
        extraction_status: ExtractionStatus::Succeeded,
        extracted_at: Utc::now(),
    }
}
