//! Knowledge progression: per-(user, subject) level state driven by quiz and
//! content evidence.

pub mod blend;
pub mod tracker;

use serde::Serialize;
use study_core::{ChangeReason, Classify, ErrorClass, KnowledgeLevel, StoreError};
use thiserror::Error;

pub use tracker::{KnowledgeTracker, Transition};

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Rejected before any store access.
    #[error("invalid knowledge update: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for TrackerError {
    fn class(&self) -> ErrorClass {
        match self {
            TrackerError::Validation(_) => ErrorClass::Fatal,
            TrackerError::Store(e) => e.class(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            TrackerError::Validation(reason) => reason.clone(),
            TrackerError::Store(e) => e.user_message(),
        }
    }
}

/// One piece of evidence about a user's level in a subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// Completed quiz; `score` is a percentage.
    Quiz { score: f64, difficulty: KnowledgeLevel },
    /// Estimated level of content the user is studying.
    Content { estimated_level: KnowledgeLevel },
    /// Level set by the user or an admin, applied verbatim. Kept as a raw
    /// integer so out-of-range requests can be rejected with a reason.
    ManualOverride { level: u8 },
}

impl Evidence {
    pub fn reason(&self) -> ChangeReason {
        match self {
            Evidence::Quiz { .. } => ChangeReason::QuizCompletion,
            Evidence::Content { .. } => ChangeReason::ContentAnalysis,
            Evidence::ManualOverride { .. } => ChangeReason::ManualOverride,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), TrackerError> {
        match *self {
            Evidence::Quiz { score, .. } if !(0.0..=100.0).contains(&score) => Err(
                TrackerError::Validation(format!("quiz score {score} outside 0..=100")),
            ),
            Evidence::ManualOverride { level } if KnowledgeLevel::new(level).is_none() => Err(
                TrackerError::Validation(format!("knowledge level {level} outside 0..=5")),
            ),
            _ => Ok(()),
        }
    }
}
