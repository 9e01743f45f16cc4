//! Structured shapes of AI answers and the parsing that produces them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use study_core::{KnowledgeLevel, OperationKind};

/// Implemented by every structured answer the orchestrator can produce.
pub trait AiPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: OperationKind;

    /// Build the payload from the provider's raw text.
    fn parse(raw: &str) -> Result<Self, String>;

    fn confidence(&self) -> f64 {
        1.0
    }
}

// ── Study guide ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyStep {
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyPlan {
    pub title: String,
    pub steps: Vec<StudyStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyGuide {
    pub feedback: Feedback,
    pub study_plan: StudyPlan,
}

impl AiPayload for StudyGuide {
    const KIND: OperationKind = OperationKind::StudyGuide;

    fn parse(raw: &str) -> Result<Self, String> {
        let guide: StudyGuide = parse_json(raw)?;
        if guide.study_plan.steps.is_empty() {
            return Err("study plan has no steps".into());
        }
        Ok(guide)
    }
}

// ── Quiz ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Option<KnowledgeLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

impl AiPayload for Quiz {
    const KIND: OperationKind = OperationKind::Quiz;

    fn parse(raw: &str) -> Result<Self, String> {
        let quiz: Quiz = parse_json(raw)?;
        if quiz.questions.is_empty() {
            return Err("quiz has no questions".into());
        }
        for (i, q) in quiz.questions.iter().enumerate() {
            if q.options.len() < 2 {
                return Err(format!("question {} has fewer than two options", i + 1));
            }
            if !q.options.iter().any(|o| o == &q.answer) {
                return Err(format!("question {} answer is not one of its options", i + 1));
            }
        }
        Ok(quiz)
    }
}

// ── Chat ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub message: String,
}

impl AiPayload for ChatReply {
    const KIND: OperationKind = OperationKind::Chat;

    /// Chat answers are free text; only an empty answer is malformed.
    fn parse(raw: &str) -> Result<Self, String> {
        let message = raw.trim();
        if message.is_empty() {
            return Err("empty chat reply".into());
        }
        Ok(ChatReply {
            message: message.to_string(),
        })
    }
}

// ── File analysis ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileAnalysis {
    pub summary: String,
    #[serde(default)]
    pub key_topics: Vec<String>,
    pub difficulty: KnowledgeLevel,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Model's self-reported certainty, clamped to [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

impl AiPayload for FileAnalysis {
    const KIND: OperationKind = OperationKind::FileAnalysis;

    fn parse(raw: &str) -> Result<Self, String> {
        let mut analysis: FileAnalysis = parse_json(raw)?;
        if analysis.summary.trim().is_empty() {
            return Err("analysis summary is empty".into());
        }
        analysis.confidence = if analysis.confidence.is_finite() {
            analysis.confidence.clamp(0.0, 1.0)
        } else {
            default_confidence()
        };
        Ok(analysis)
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(extract_json(raw)).map_err(|e| e.to_string())
}

/// Extract JSON from an LLM response, handling markdown code blocks.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_tick = &trimmed[start + 3..];
        // Skip a language tag on the fence line.
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

/// Shorten a raw response for logging, respecting char boundaries.
pub(crate) fn truncate_for_log(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &raw[..idx]),
        None => raw.to_string(),
    }
}
