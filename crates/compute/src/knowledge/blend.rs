//! Pure transition arithmetic for the knowledge progression state machine.

use study_core::KnowledgeLevel;

/// Level implied by a quiz: declared difficulty scaled by the score.
pub fn quiz_implied_level(score: f64, difficulty: KnowledgeLevel) -> f64 {
    difficulty.as_f64() * score.clamp(0.0, 100.0) / 100.0
}

/// `previous * (1 - weight) + implied * weight`, not yet rounded.
pub fn blend(previous: KnowledgeLevel, implied: f64, weight: f64) -> f64 {
    let weight = weight.clamp(0.0, 1.0);
    previous.as_f64() * (1.0 - weight) + implied.clamp(0.0, KnowledgeLevel::MAX.as_f64()) * weight
}

/// Whether moving from `stored` to `computed` is a recordable transition.
pub fn crosses_threshold(stored: KnowledgeLevel, computed: KnowledgeLevel, threshold: f64) -> bool {
    (computed.as_f64() - stored.as_f64()).abs() >= threshold
}

/// Running confidence: an exponential average of per-evidence confidence.
pub fn blend_confidence(previous: f64, evidence: f64, weight: f64) -> f64 {
    let weight = weight.clamp(0.0, 1.0);
    (previous * (1.0 - weight) + evidence * weight).clamp(0.0, 1.0)
}
