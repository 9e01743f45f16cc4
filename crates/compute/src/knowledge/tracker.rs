use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use study_core::config::KnowledgeConfig;
use study_core::{
    ContentDifficultyAnalysis, KnowledgeLevel, KnowledgeProgression, KnowledgeStore,
    QuizPerformance, StoreError, UserId, UserKnowledgeProfile,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::blend::{blend, blend_confidence, crosses_threshold, quiz_implied_level};
use super::{Evidence, TrackerError};

/// Confidence attached to content-derived evidence.
const CONTENT_EVIDENCE_CONFIDENCE: f64 = 0.6;
/// Starting confidence for a profile with no history.
const INITIAL_CONFIDENCE: f64 = 0.5;
/// Idle per-key locks are pruned once the table grows past this size.
const LOCK_TABLE_PRUNE_AT: usize = 1024;

type ProfileKey = (UserId, String);

/// Result of applying one piece of evidence.
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub profile: UserKnowledgeProfile,
    /// Present when the level moved far enough to be recorded.
    pub progression: Option<KnowledgeProgression>,
}

/// Single writer for knowledge profiles and their progression log.
///
/// Updates to one (user, subject) key are serialized through a per-key async
/// mutex; different keys proceed independently. Each update reads the stored
/// profile, computes the next state without side effects, then commits the
/// profile upsert and the optional log append in a task that runs to
/// completion even if the caller is dropped.
pub struct KnowledgeTracker {
    store: Arc<dyn KnowledgeStore>,
    config: KnowledgeConfig,
    locks: Mutex<HashMap<ProfileKey, Arc<AsyncMutex<()>>>>,
}

impl KnowledgeTracker {
    pub fn new(store: Arc<dyn KnowledgeStore>, config: KnowledgeConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Apply `evidence` to the (user, subject) profile.
    pub async fn apply(
        &self,
        user_id: UserId,
        subject: &str,
        evidence: Evidence,
    ) -> Result<Transition, TrackerError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(TrackerError::Validation("subject must not be empty".into()));
        }
        evidence.validate()?;

        let guard = self.lock(user_id, subject).await?;

        let stored = self.store.get_profile(user_id, subject).await?;
        let (next, progression) = self.compute(user_id, subject, stored.as_ref(), evidence);

        let store = Arc::clone(&self.store);
        let profile = next.clone();
        let entry = progression.clone();
        tokio::spawn(async move {
            let _guard = guard;
            store.upsert_profile(&profile).await?;
            if let Some(entry) = &entry {
                store.append_progression(entry).await?;
            }
            Ok::<_, StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("knowledge commit task failed: {e}")))??;

        match &progression {
            Some(entry) => info!(
                user_id,
                subject,
                from = %entry.previous_level,
                to = %entry.new_level,
                reason = entry.change_reason.as_str(),
                "knowledge level transition"
            ),
            None => debug!(
                user_id,
                subject,
                level = %next.knowledge_level,
                "knowledge evidence absorbed"
            ),
        }

        Ok(Transition {
            profile: next,
            progression,
        })
    }

    /// Persist a completed quiz and feed it in as evidence.
    pub async fn record_quiz(
        &self,
        performance: &QuizPerformance,
    ) -> Result<Transition, TrackerError> {
        let evidence = Evidence::Quiz {
            score: performance.score,
            difficulty: performance.difficulty,
        };
        evidence.validate()?;
        self.store.save_quiz_performance(performance).await?;
        self.apply(performance.user_id, &performance.subject, evidence).await
    }

    pub async fn apply_content_analysis(
        &self,
        user_id: UserId,
        subject: &str,
        analysis: &ContentDifficultyAnalysis,
    ) -> Result<Transition, TrackerError> {
        let evidence = Evidence::Content {
            estimated_level: analysis.knowledge_level,
        };
        self.apply(user_id, subject, evidence).await
    }

    pub async fn override_level(
        &self,
        user_id: UserId,
        subject: &str,
        level: u8,
    ) -> Result<Transition, TrackerError> {
        self.apply(user_id, subject, Evidence::ManualOverride { level }).await
    }

    /// Next profile state and the log entry to append, if any. No I/O.
    fn compute(
        &self,
        user_id: UserId,
        subject: &str,
        stored: Option<&UserKnowledgeProfile>,
        evidence: Evidence,
    ) -> (UserKnowledgeProfile, Option<KnowledgeProgression>) {
        let now = Utc::now();
        let previous_level = stored
            .map(|p| p.knowledge_level)
            .unwrap_or_else(|| KnowledgeLevel::from_estimate(f64::from(self.config.initial_level)));
        let previous_confidence = stored.map_or(INITIAL_CONFIDENCE, |p| p.confidence_score);

        let (new_level, confidence, record) = match evidence {
            Evidence::ManualOverride { level } => {
                let level = KnowledgeLevel::from_estimate(f64::from(level));
                (level, 1.0, true)
            }
            Evidence::Quiz { score, difficulty } => {
                let weight = self.config.quiz_weight;
                let computed = KnowledgeLevel::from_estimate(blend(
                    previous_level,
                    quiz_implied_level(score, difficulty),
                    weight,
                ));
                let confidence = blend_confidence(previous_confidence, score / 100.0, weight);
                let record =
                    crosses_threshold(previous_level, computed, self.config.transition_threshold);
                (computed, confidence, record)
            }
            Evidence::Content { estimated_level } => {
                let weight = self.config.content_weight;
                let computed = KnowledgeLevel::from_estimate(blend(
                    previous_level,
                    estimated_level.as_f64(),
                    weight,
                ));
                let confidence =
                    blend_confidence(previous_confidence, CONTENT_EVIDENCE_CONFIDENCE, weight);
                let record =
                    crosses_threshold(previous_level, computed, self.config.transition_threshold);
                (computed, confidence, record)
            }
        };

        // Sub-threshold moves keep the stored level.
        let knowledge_level = if record { new_level } else { previous_level };

        let profile = UserKnowledgeProfile {
            user_id,
            subject: subject.to_string(),
            knowledge_level,
            confidence_score: confidence,
            last_updated: now,
        };
        let progression = record.then(|| KnowledgeProgression {
            user_id,
            subject: subject.to_string(),
            previous_level,
            new_level,
            change_reason: evidence.reason(),
            confidence_score: confidence,
            created_at: now,
        });
        (profile, progression)
    }

    async fn lock(
        &self,
        user_id: UserId,
        subject: &str,
    ) -> Result<OwnedMutexGuard<()>, TrackerError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|e| StoreError::Backend(format!("knowledge lock table poisoned: {e}")))?;
            if locks.len() >= LOCK_TABLE_PRUNE_AT {
                // Only the table holds an idle lock.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(
                locks
                    .entry((user_id, subject.to_string()))
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        Ok(lock.lock_owned().await)
    }
}
