use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an authenticated user.
pub type UserId = i64;

/// Identifier of a generated quiz.
pub type QuizId = i64;

/// Ordinal proficiency estimate: 0 = elementary … 5 = expert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub struct KnowledgeLevel(u8);

impl KnowledgeLevel {
    pub const MIN: KnowledgeLevel = KnowledgeLevel(0);
    pub const MAX: KnowledgeLevel = KnowledgeLevel(5);

    /// Returns `None` for values outside 0..=5.
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX.0).then_some(Self(level))
    }

    /// Round a continuous estimate to the nearest level, clamped to 0..=5.
    pub fn from_estimate(estimate: f64) -> Self {
        if !estimate.is_finite() {
            return Self::MIN;
        }
        let rounded = estimate.round().clamp(0.0, Self::MAX.0 as f64);
        Self(rounded as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "elementary",
            1 => "beginner",
            2 => "intermediate",
            3 => "upper-intermediate",
            4 => "advanced",
            _ => "expert",
        }
    }
}

impl TryFrom<u8> for KnowledgeLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("knowledge level {value} outside 0..=5"))
    }
}

impl From<KnowledgeLevel> for u8 {
    fn from(level: KnowledgeLevel) -> Self {
        level.0
    }
}

impl fmt::Display for KnowledgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a knowledge profile moved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeReason {
    #[serde(rename = "quiz completion")]
    QuizCompletion,
    #[serde(rename = "content analysis")]
    ContentAnalysis,
    #[serde(rename = "manual override")]
    ManualOverride,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::QuizCompletion => "quiz completion",
            ChangeReason::ContentAnalysis => "content analysis",
            ChangeReason::ManualOverride => "manual override",
        }
    }
}

/// The single active row per (user, subject).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserKnowledgeProfile {
    pub user_id: UserId,
    pub subject: String,
    pub knowledge_level: KnowledgeLevel,
    /// 0.0 ..= 1.0
    pub confidence_score: f64,
    pub last_updated: DateTime<Utc>,
}

/// Append-only audit entry written whenever a profile changes level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeProgression {
    pub user_id: UserId,
    pub subject: String,
    pub previous_level: KnowledgeLevel,
    pub new_level: KnowledgeLevel,
    pub change_reason: ChangeReason,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// One quiz attempt. Created once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizPerformance {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub subject: String,
    /// Percentage, 0.0 ..= 100.0
    pub score: f64,
    pub knowledge_level: KnowledgeLevel,
    /// Declared quiz difficulty on the same 0..=5 scale.
    pub difficulty: KnowledgeLevel,
    pub time_spent_seconds: u32,
    pub completed_at: DateTime<Utc>,
}
