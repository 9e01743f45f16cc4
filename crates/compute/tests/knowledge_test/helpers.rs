use std::sync::Arc;

use chrono::Utc;

use study_compute::KnowledgeTracker;
use study_core::config::KnowledgeConfig;
use study_core::{
    KnowledgeLevel, KnowledgeStore, MemoryKnowledgeStore, QuizPerformance, UserId,
    UserKnowledgeProfile,
};

pub fn level(v: u8) -> KnowledgeLevel {
    KnowledgeLevel::new(v).unwrap()
}

/// Tracker with default weights over a fresh in-memory store.
pub fn make_tracker() -> (Arc<KnowledgeTracker>, Arc<MemoryKnowledgeStore>) {
    let store = Arc::new(MemoryKnowledgeStore::new());
    let tracker = Arc::new(KnowledgeTracker::new(store.clone(), KnowledgeConfig::default()));
    (tracker, store)
}

/// Store an existing profile at `lvl`.
pub async fn seed_profile(store: &MemoryKnowledgeStore, user_id: UserId, subject: &str, lvl: u8) {
    store
        .upsert_profile(&UserKnowledgeProfile {
            user_id,
            subject: subject.to_string(),
            knowledge_level: level(lvl),
            confidence_score: 0.5,
            last_updated: Utc::now(),
        })
        .await
        .unwrap();
}

pub fn make_quiz(
    user_id: UserId,
    quiz_id: i64,
    subject: &str,
    score: f64,
    difficulty: u8,
) -> QuizPerformance {
    QuizPerformance {
        user_id,
        quiz_id,
        subject: subject.to_string(),
        score,
        knowledge_level: level(0),
        difficulty: level(difficulty),
        time_spent_seconds: 300,
        completed_at: Utc::now(),
    }
}
