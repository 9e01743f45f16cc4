pub mod algorithms;
pub mod knowledge;

pub use algorithms::difficulty::{analyze, recommended_quiz_length, ComplexityBreakdown};
pub use knowledge::{Evidence, KnowledgeTracker, TrackerError, Transition};
