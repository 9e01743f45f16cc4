use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use study_core::{ContentDifficultyAnalysis, FileId, KnowledgeLevel};

use super::keywords::{is_domain_keyword, is_stopword};

/// Score bands: a score below `LEVEL_BANDS[i]` maps to level `i`; anything
/// at or above the last bound is level 5.
pub const LEVEL_BANDS: [f64; 5] = [15.0, 30.0, 45.0, 60.0, 75.0];

pub const MIN_QUESTIONS: u32 = 3;
pub const MAX_QUESTIONS: u32 = 50;
pub const MIN_MINUTES: u32 = 5;

/// Words per generated question.
const WORDS_PER_QUESTION: usize = 150;
/// Concepts per generated question.
const CONCEPTS_PER_QUESTION: usize = 4;
/// Reading speed used for the time estimate.
const WORDS_PER_MINUTE: usize = 200;
/// A non-keyword term counts as a concept once it repeats this often.
const CONCEPT_REPEAT_THRESHOLD: usize = 3;

/// Individual heuristics, each normalized to 0..=1, plus the weighted score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplexityBreakdown {
    pub word_count: usize,
    pub sentence_count: usize,
    pub vocabulary_diversity: f64,
    pub sentence_length: f64,
    pub keyword_density: f64,
    pub long_word_ratio: f64,
    /// 0.0 ..= 100.0
    pub score: f64,
}

/// Lowercased alphanumeric words.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .map(|w| w.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?', '\n'])
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count()
}

/// Lexical complexity of `text`. Empty text scores zero.
pub fn complexity(text: &str) -> ComplexityBreakdown {
    let words = words(text);
    if words.is_empty() {
        return ComplexityBreakdown::default();
    }
    let total = words.len() as f64;
    let sentences = sentence_count(text).max(1);

    let unique: HashSet<&str> = words.iter().map(String::as_str).collect();
    // Guiraud's index: stable across text lengths, unlike the plain type/token ratio.
    let vocabulary_diversity = (unique.len() as f64 / total.sqrt() / 12.0).min(1.0);
    let sentence_length = (total / sentences as f64 / 30.0).min(1.0);
    let keyword_hits = words.iter().filter(|w| is_domain_keyword(w)).count() as f64;
    let keyword_density = (keyword_hits / total / 0.05).min(1.0);
    let long_words = words.iter().filter(|w| w.chars().count() >= 7).count() as f64;
    let long_word_ratio = (long_words / total / 0.35).min(1.0);

    let score = 100.0
        * (0.30 * vocabulary_diversity
            + 0.25 * sentence_length
            + 0.30 * keyword_density
            + 0.15 * long_word_ratio);

    ComplexityBreakdown {
        word_count: words.len(),
        sentence_count: sentences,
        vocabulary_diversity,
        sentence_length,
        keyword_density,
        long_word_ratio,
        score: score.clamp(0.0, 100.0),
    }
}

/// Fixed band mapping from complexity score to knowledge level.
pub fn level_for_score(score: f64) -> KnowledgeLevel {
    let level = LEVEL_BANDS.iter().take_while(|bound| score >= **bound).count();
    KnowledgeLevel::from_estimate(level as f64)
}

/// Domain keywords present plus repeated content words.
pub fn key_concepts(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in words(text) {
        *counts.entry(word).or_insert(0) += 1;
    }
    let mut concepts: Vec<String> = counts
        .into_iter()
        .filter(|(word, count)| {
            is_domain_keyword(word)
                || (*count >= CONCEPT_REPEAT_THRESHOLD
                    && word.chars().count() >= 5
                    && !is_stopword(word)
                    && !word.chars().all(|c| c.is_ascii_digit()))
        })
        .map(|(word, _)| word)
        .collect();
    concepts.sort();
    concepts
}

/// Question count scales with volume and concept count, within 3..=50.
pub fn estimate_question_count(word_count: usize, concept_count: usize) -> u32 {
    let raw = word_count / WORDS_PER_QUESTION + concept_count / CONCEPTS_PER_QUESTION;
    (raw.min(MAX_QUESTIONS as usize) as u32).clamp(MIN_QUESTIONS, MAX_QUESTIONS)
}

/// Reading time plus a minute per question, never below five minutes.
pub fn estimate_minutes(word_count: usize, question_count: u32) -> u32 {
    let reading = word_count.div_ceil(WORDS_PER_MINUTE);
    let minutes = reading.saturating_add(question_count as usize);
    (minutes.min(u32::MAX as usize) as u32).max(MIN_MINUTES)
}

/// Requested quiz length clamped into 3..=50, defaulting to the estimate.
pub fn recommended_quiz_length(
    analysis: &ContentDifficultyAnalysis,
    requested: Option<u32>,
) -> u32 {
    requested
        .unwrap_or(analysis.estimated_question_count)
        .clamp(MIN_QUESTIONS, MAX_QUESTIONS)
}

/// Full analysis of one file's extracted text. Pure; the caller persists.
pub fn analyze(file_id: FileId, text: &str) -> ContentDifficultyAnalysis {
    let breakdown = complexity(text);
    let concepts = key_concepts(text);
    let questions = estimate_question_count(breakdown.word_count, concepts.len());

    ContentDifficultyAnalysis {
        file_id,
        complexity_score: breakdown.score,
        knowledge_level: level_for_score(breakdown.score),
        unique_concept_count: concepts.len(),
        content_volume: breakdown.word_count,
        estimated_question_count: questions,
        time_estimate_minutes: estimate_minutes(breakdown.word_count, questions),
        analyzed_at: Utc::now(),
    }
}
