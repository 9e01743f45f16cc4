use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::FileId;
use crate::knowledge::KnowledgeLevel;

/// Lexical difficulty estimate for one file. Recomputing overwrites the
/// previous row; `analyzed_at` orders competing writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentDifficultyAnalysis {
    pub file_id: FileId,
    /// 0.0 ..= 100.0
    pub complexity_score: f64,
    pub knowledge_level: KnowledgeLevel,
    pub unique_concept_count: usize,
    /// Word count of the analyzed text.
    pub content_volume: usize,
    pub estimated_question_count: u32,
    pub time_estimate_minutes: u32,
    pub analyzed_at: DateTime<Utc>,
}
