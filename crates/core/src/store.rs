//! Ports to the persistence collaborators the pipeline writes through.
//!
//! The relational schema behind these is owned elsewhere; the pipeline only
//! relies on the operations below. In-memory implementations live in
//! [`crate::memory`].

use async_trait::async_trait;

use crate::ai::AiResult;
use crate::document::{ExtractedContent, FileId};
use crate::error::StoreError;
use crate::knowledge::{KnowledgeProgression, QuizPerformance, UserId, UserKnowledgeProfile};

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_extracted_content(
        &self,
        file_id: FileId,
        content: &ExtractedContent,
    ) -> Result<(), StoreError>;

    async fn get_extracted_content(
        &self,
        file_id: FileId,
    ) -> Result<Option<ExtractedContent>, StoreError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save_analysis_result(&self, result: &AiResult) -> Result<(), StoreError>;

    /// Latest file-analysis result recorded for `file_id`.
    async fn get_analysis_result_by_file_id(
        &self,
        file_id: FileId,
    ) -> Result<Option<AiResult>, StoreError>;
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn get_profile(
        &self,
        user_id: UserId,
        subject: &str,
    ) -> Result<Option<UserKnowledgeProfile>, StoreError>;

    async fn upsert_profile(&self, profile: &UserKnowledgeProfile) -> Result<(), StoreError>;

    async fn append_progression(&self, entry: &KnowledgeProgression) -> Result<(), StoreError>;

    async fn save_quiz_performance(&self, performance: &QuizPerformance)
        -> Result<(), StoreError>;
}
