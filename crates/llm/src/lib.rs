pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod providers;
pub mod response;
pub mod retry;

pub use cache::{CacheStats, ResultCache};
pub use error::AiError;
pub use fingerprint::FingerprintBuilder;
pub use orchestrator::{AiOrchestrator, Generated};
pub use prompts::{ConversationContext, StudyContext};
pub use provider::{CompletionRequest, LlmError, LlmProvider, Message, Role};
pub use providers::create_client;
pub use response::{
    AiPayload, ChatReply, Feedback, FileAnalysis, Quiz, QuizQuestion, StudyGuide, StudyPlan,
    StudyStep,
};
