use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::OperationKind;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.as_str(), "true" | "1"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub knowledge: KnowledgeConfig,
    pub ocr: OcrConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STUDY_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STUDY_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            storage: StorageConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            retry: RetryConfig::from_env_profiled(p),
            cache: CacheConfig::from_env_profiled(p),
            knowledge: KnowledgeConfig::from_env_profiled(p),
            ocr: OcrConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  storage:   upload_dir={}, asset_dir={}",
            self.storage.upload_dir.display(),
            self.storage.asset_dir.display()
        );
        tracing::info!(
            "  llm:       provider={}, guest_model={}, member_model={}, max_in_flight={}",
            self.llm.provider,
            self.llm.guest_model,
            self.llm.member_model,
            self.llm.max_concurrent_calls
        );
        tracing::info!(
            "  retry:     attempts={}, base_delay_ms={}",
            self.retry.max_attempts,
            self.retry.base_delay_ms
        );
        tracing::info!("  cache:     capacity={}", self.cache.capacity);
        tracing::info!(
            "  knowledge: quiz_weight={}, content_weight={}",
            self.knowledge.quiz_weight,
            self.knowledge.content_weight
        );
        tracing::info!(
            "  ocr:       binary={}, language={}, timeout_secs={}",
            self.ocr.tesseract_binary,
            self.ocr.language,
            self.ocr.timeout_secs
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "storage": {
                "upload_dir": self.storage.upload_dir,
                "asset_dir": self.storage.asset_dir,
            },
            "llm": {
                "provider": self.llm.provider,
                "guest_model": self.llm.guest_model,
                "member_model": self.llm.member_model,
                "max_concurrent_calls": self.llm.max_concurrent_calls,
                "configured": self.llm.is_configured(),
            },
            "retry": {
                "max_attempts": self.retry.max_attempts,
                "base_delay_ms": self.retry.base_delay_ms,
                "max_delay_ms": self.retry.max_delay_ms,
            },
            "cache": {
                "capacity": self.cache.capacity,
                "ttl_secs": {
                    "study_guide": self.cache.study_guide_ttl_secs,
                    "quiz": self.cache.quiz_ttl_secs,
                    "chat": self.cache.chat_ttl_secs,
                    "file_analysis": self.cache.file_analysis_ttl_secs,
                },
            },
            "knowledge": {
                "quiz_weight": self.knowledge.quiz_weight,
                "content_weight": self.knowledge.content_weight,
            },
        })
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Where PDF and Word extractors write embedded images.
    pub asset_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let upload_dir = PathBuf::from(profiled_env_or(p, "UPLOAD_DIR", "uploads"));
        let asset_dir = PathBuf::from(profiled_env_or(
            p,
            "ASSET_DIR",
            upload_dir.join("assets").to_str().unwrap_or("uploads/assets"),
        ));
        Self {
            upload_dir,
            asset_dir,
        }
    }
}

// ── LLM (OpenAI / Anthropic / Ollama) ─────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "anthropic", "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ollama_url: String,
    /// Model used for unauthenticated callers (cheaper/faster tier).
    pub guest_model: String,
    /// Model used for signed-in users.
    pub member_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Global ceiling on concurrent in-flight provider calls.
    pub max_concurrent_calls: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        let provider = profiled_env_or(p, "LLM_PROVIDER", "openai");
        let (guest_default, member_default) = default_models(&provider);
        Self {
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            anthropic_api_key: profiled_env_opt(p, "ANTHROPIC_API_KEY"),
            ollama_url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            guest_model: profiled_env_or(p, "LLM_GUEST_MODEL", guest_default),
            member_model: profiled_env_or(p, "LLM_MEMBER_MODEL", member_default),
            temperature: profiled_env_or(p, "LLM_TEMPERATURE", "0.3")
                .parse()
                .unwrap_or(0.3),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 4096),
            request_timeout_secs: profiled_env_u64(p, "LLM_REQUEST_TIMEOUT_SECS", 60),
            max_concurrent_calls: profiled_env_u32(p, "LLM_MAX_CONCURRENT_CALLS", 8).max(1),
            provider,
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "anthropic" | "claude" => self.anthropic_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }

    /// Model identifier for the caller's tier.
    pub fn model_for(&self, is_guest: bool) -> &str {
        if is_guest {
            &self.guest_model
        } else {
            &self.member_model
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        let (guest, member) = default_models("openai");
        Self {
            provider: "openai".into(),
            openai_api_key: None,
            openai_base_url: None,
            anthropic_api_key: None,
            ollama_url: "http://localhost:11434".into(),
            guest_model: guest.into(),
            member_model: member.into(),
            temperature: 0.3,
            max_tokens: 4096,
            request_timeout_secs: 60,
            max_concurrent_calls: 8,
        }
    }
}

fn default_models(provider: &str) -> (&'static str, &'static str) {
    match provider {
        "anthropic" | "claude" => ("claude-3-5-haiku-latest", "claude-sonnet-4-5-20250929"),
        "ollama" => ("llama3.2:1b", "llama3.2"),
        _ => ("gpt-4o-mini", "gpt-4o"),
    }
}

// ── Retry ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl RetryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_attempts: profiled_env_u32(p, "AI_RETRY_MAX_ATTEMPTS", 3).max(1),
            base_delay_ms: profiled_env_u64(p, "AI_RETRY_BASE_DELAY_MS", 500),
            backoff_factor: profiled_env_f64(p, "AI_RETRY_BACKOFF_FACTOR", 2.0),
            max_delay_ms: profiled_env_u64(p, "AI_RETRY_MAX_DELAY_MS", 8_000),
            jitter: profiled_env_bool(p, "AI_RETRY_JITTER", true),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            backoff_factor: 2.0,
            max_delay_ms: 8_000,
            jitter: true,
        }
    }
}

// ── Result cache ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// LRU bound on distinct fingerprints.
    pub capacity: usize,
    pub study_guide_ttl_secs: u64,
    pub quiz_ttl_secs: u64,
    pub chat_ttl_secs: u64,
    pub file_analysis_ttl_secs: u64,
}

impl CacheConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            capacity: profiled_env_u32(p, "AI_CACHE_CAPACITY", 1024) as usize,
            study_guide_ttl_secs: profiled_env_u64(p, "AI_CACHE_TTL_STUDY_GUIDE_SECS", 3600),
            quiz_ttl_secs: profiled_env_u64(p, "AI_CACHE_TTL_QUIZ_SECS", 600),
            chat_ttl_secs: profiled_env_u64(p, "AI_CACHE_TTL_CHAT_SECS", 120),
            file_analysis_ttl_secs: profiled_env_u64(p, "AI_CACHE_TTL_FILE_ANALYSIS_SECS", 86_400),
        }
    }

    pub fn ttl_for(&self, kind: OperationKind) -> Duration {
        let secs = match kind {
            OperationKind::StudyGuide => self.study_guide_ttl_secs,
            OperationKind::Quiz => self.quiz_ttl_secs,
            OperationKind::Chat => self.chat_ttl_secs,
            OperationKind::FileAnalysis => self.file_analysis_ttl_secs,
        };
        Duration::from_secs(secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            study_guide_ttl_secs: 3600,
            quiz_ttl_secs: 600,
            chat_ttl_secs: 120,
            file_analysis_ttl_secs: 86_400,
        }
    }
}

// ── Knowledge progression ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Share of a quiz-implied level in the blended estimate.
    pub quiz_weight: f64,
    /// Share of a content-implied level in the blended estimate.
    pub content_weight: f64,
    /// Minimum level distance that records a transition.
    pub transition_threshold: f64,
    /// Level assumed for a (user, subject) with no profile yet.
    pub initial_level: u8,
}

impl KnowledgeConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            quiz_weight: profiled_env_f64(p, "KNOWLEDGE_QUIZ_WEIGHT", 0.5).clamp(0.0, 1.0),
            content_weight: profiled_env_f64(p, "KNOWLEDGE_CONTENT_WEIGHT", 0.3).clamp(0.0, 1.0),
            transition_threshold: profiled_env_f64(p, "KNOWLEDGE_TRANSITION_THRESHOLD", 1.0),
            initial_level: profiled_env_u32(p, "KNOWLEDGE_INITIAL_LEVEL", 0).min(5) as u8,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            quiz_weight: 0.5,
            content_weight: 0.3,
            transition_threshold: 1.0,
            initial_level: 0,
        }
    }
}

// ── OCR ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub tesseract_binary: String,
    pub language: String,
    /// A recognizer still running after this long is killed.
    pub timeout_secs: u64,
}

impl OcrConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            tesseract_binary: profiled_env_or(p, "TESSERACT_BIN", "tesseract"),
            language: profiled_env_or(p, "OCR_LANGUAGE", "eng"),
            timeout_secs: profiled_env_u64(p, "OCR_TIMEOUT_SECS", 60),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_binary: "tesseract".into(),
            language: "eng".into(),
            timeout_secs: 60,
        }
    }
}
