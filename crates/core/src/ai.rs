use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::FileId;
use crate::knowledge::UserId;

/// The AI operations the orchestrator knows how to run and cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    StudyGuide,
    Quiz,
    Chat,
    FileAnalysis,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::StudyGuide => "study_guide",
            OperationKind::Quiz => "quiz",
            OperationKind::Chat => "chat",
            OperationKind::FileAnalysis => "file_analysis",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is asking. Guests are routed to a cheaper model tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Caller {
    Guest,
    User(UserId),
}

impl Caller {
    pub fn is_guest(&self) -> bool {
        matches!(self, Caller::Guest)
    }

    /// Stable token used inside prompt fingerprints.
    pub fn fingerprint_token(&self) -> String {
        match self {
            Caller::Guest => "guest".to_string(),
            Caller::User(id) => format!("user:{id}"),
        }
    }
}

/// SHA-256 hex digest identifying a cacheable AI request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, enough to tell requests apart in logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured result of one AI operation, as persisted by the result store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiResult {
    pub operation_kind: OperationKind,
    pub fingerprint: Fingerprint,
    /// Parsed response re-serialized as JSON.
    pub result_payload: serde_json::Value,
    /// Set for file analyses so the result can be looked up per file.
    pub file_id: Option<FileId>,
    pub model: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}
