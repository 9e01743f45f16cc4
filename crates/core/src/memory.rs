//! In-memory store implementations.
//!
//! Guarded by `std::sync::RwLock`; no lock is held across an await point.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::ai::{AiResult, OperationKind};
use crate::document::{ExtractedContent, FileId};
use crate::error::StoreError;
use crate::knowledge::{KnowledgeProgression, QuizPerformance, UserId, UserKnowledgeProfile};
use crate::store::{ContentStore, KnowledgeStore, ResultStore};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

#[derive(Default)]
pub struct MemoryContentStore {
    contents: RwLock<HashMap<FileId, ExtractedContent>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contents.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn save_extracted_content(
        &self,
        file_id: FileId,
        content: &ExtractedContent,
    ) -> Result<(), StoreError> {
        let mut contents = self.contents.write().map_err(poisoned)?;
        contents.insert(file_id, content.clone());
        Ok(())
    }

    async fn get_extracted_content(
        &self,
        file_id: FileId,
    ) -> Result<Option<ExtractedContent>, StoreError> {
        let contents = self.contents.read().map_err(poisoned)?;
        Ok(contents.get(&file_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryResultStore {
    results: RwLock<Vec<AiResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<AiResult> {
        self.results.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn save_analysis_result(&self, result: &AiResult) -> Result<(), StoreError> {
        let mut results = self.results.write().map_err(poisoned)?;
        results.push(result.clone());
        Ok(())
    }

    async fn get_analysis_result_by_file_id(
        &self,
        file_id: FileId,
    ) -> Result<Option<AiResult>, StoreError> {
        let results = self.results.read().map_err(poisoned)?;
        Ok(results
            .iter()
            .filter(|r| r.operation_kind == OperationKind::FileAnalysis)
            .filter(|r| r.file_id == Some(file_id))
            .max_by_key(|r| r.created_at)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryKnowledgeStore {
    profiles: RwLock<HashMap<(UserId, String), UserKnowledgeProfile>>,
    progressions: RwLock<Vec<KnowledgeProgression>>,
    quiz_performances: RwLock<Vec<QuizPerformance>>,
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progression log for one (user, subject), oldest first.
    pub fn progressions_for(&self, user_id: UserId, subject: &str) -> Vec<KnowledgeProgression> {
        self.progressions
            .read()
            .map(|p| {
                p.iter()
                    .filter(|e| e.user_id == user_id && e.subject == subject)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn quiz_performances(&self) -> Vec<QuizPerformance> {
        self.quiz_performances
            .read()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn get_profile(
        &self,
        user_id: UserId,
        subject: &str,
    ) -> Result<Option<UserKnowledgeProfile>, StoreError> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles.get(&(user_id, subject.to_string())).cloned())
    }

    async fn upsert_profile(&self, profile: &UserKnowledgeProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        profiles.insert((profile.user_id, profile.subject.clone()), profile.clone());
        Ok(())
    }

    async fn append_progression(&self, entry: &KnowledgeProgression) -> Result<(), StoreError> {
        let mut progressions = self.progressions.write().map_err(poisoned)?;
        progressions.push(entry.clone());
        Ok(())
    }

    async fn save_quiz_performance(
        &self,
        performance: &QuizPerformance,
    ) -> Result<(), StoreError> {
        let mut performances = self.quiz_performances.write().map_err(poisoned)?;
        performances.push(performance.clone());
        Ok(())
    }
}
