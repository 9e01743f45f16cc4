//! Format-specific extractors behind one [`Extractor`] capability.
//!
//! PDF and Word extraction fail hard on unreadable input. Image, media and
//! PowerPoint extraction are best-effort: on any internal error they log a
//! warning and return empty results.

pub mod image;
pub mod media;
pub mod ocr;
mod ooxml;
pub mod pdf;
pub mod powerpoint;
mod registry;
pub mod word;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use study_core::Metadata;
use thiserror::Error;

pub use registry::{kind_for_mime, ExtractorRegistry, IMAGE_EXTENSIONS};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("Word extraction failed: {0}")]
    Word(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("image error: {0}")]
    Image(String),
    #[error("media error: {0}")]
    Media(String),
    #[error("OCR failed: {0}")]
    Ocr(String),
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Which extractor family handles a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    Pdf,
    Word,
    PowerPoint,
    Image,
    Media,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Pdf => "pdf",
            ExtractorKind::Word => "word",
            ExtractorKind::PowerPoint => "powerpoint",
            ExtractorKind::Image => "image",
            ExtractorKind::Media => "media",
        }
    }

    /// Best-effort extractors degrade to empty output instead of failing.
    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            ExtractorKind::PowerPoint | ExtractorKind::Image | ExtractorKind::Media
        )
    }
}

/// Common contract for every format extractor.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn kind(&self) -> ExtractorKind;

    /// Plain text of the whole document.
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;

    /// Sub-assets (embedded images) found in the document.
    async fn extract_assets(&self, path: &Path) -> Result<Vec<PathBuf>, ExtractionError>;

    async fn extract_metadata(&self, path: &Path) -> Result<Metadata, ExtractionError>;
}

/// Run synchronous parsing on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ExtractionError>
where
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))?
}

/// Lowercased extension of `path`, empty when there is none.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Where sub-assets of `path` are written: the configured asset directory
/// when there is one, otherwise `sibling` (if any) beside the source file.
pub(crate) fn asset_dir_for(
    path: &Path,
    configured: Option<&Path>,
    sibling: Option<&str>,
) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    match sibling {
        Some(name) => parent.join(name),
        None => parent,
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
