pub mod ai;
pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod knowledge;
pub mod memory;
pub mod store;

pub use ai::*;
pub use analysis::*;
pub use config::Config;
pub use document::*;
pub use error::*;
pub use knowledge::*;
pub use memory::{MemoryContentStore, MemoryKnowledgeStore, MemoryResultStore};
pub use store::{ContentStore, KnowledgeStore, ResultStore};
