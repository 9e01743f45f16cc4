use study_core::{Classify, ErrorClass, OperationKind, StoreError};
use thiserror::Error;

use crate::provider::LlmError;

/// Orchestrator-level failure. `Clone` so every caller coalesced onto one
/// in-flight request receives the same error.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// Rejected before any I/O.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Retries exhausted on timeouts, rate limits or server errors.
    #[error("AI provider unavailable after {attempts} attempt(s): {reason}")]
    Transient { attempts: u32, reason: String },

    /// Non-transient provider failure (bad request, auth, misconfiguration).
    #[error("AI provider error: {0}")]
    Provider(String),

    /// The provider answered but the answer did not have the expected shape.
    #[error("malformed {kind} response: {reason}")]
    ResponseParse { kind: OperationKind, reason: String },

    #[error("result store error: {0}")]
    Store(String),
}

impl AiError {
    pub(crate) fn from_provider(e: LlmError, attempts: u32) -> Self {
        if e.is_transient() {
            AiError::Transient {
                attempts,
                reason: e.to_string(),
            }
        } else {
            AiError::Provider(e.to_string())
        }
    }
}

impl From<StoreError> for AiError {
    fn from(e: StoreError) -> Self {
        AiError::Store(e.to_string())
    }
}

impl Classify for AiError {
    fn class(&self) -> ErrorClass {
        match self {
            AiError::Transient { .. } | AiError::ResponseParse { .. } | AiError::Store(_) => {
                ErrorClass::Recoverable
            }
            AiError::Validation(_) | AiError::Provider(_) => ErrorClass::Fatal,
        }
    }

    fn user_message(&self) -> String {
        match self {
            AiError::Transient { .. } | AiError::Store(_) => {
                "AI service unavailable, please try again".into()
            }
            AiError::ResponseParse { .. } => {
                "The AI response could not be understood, please rephrase and try again".into()
            }
            AiError::Validation(reason) => reason.clone(),
            AiError::Provider(_) => "The AI service rejected the request".into(),
        }
    }
}
