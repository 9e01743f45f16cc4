pub mod document;
pub mod normalizer;
pub mod tokens;

pub use document::{
    kind_for_mime, ExtractionError, Extractor, ExtractorKind, ExtractorRegistry, IMAGE_EXTENSIONS,
};
pub use normalizer::{ContentNormalizer, IngestError};
