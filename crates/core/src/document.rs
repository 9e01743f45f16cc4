use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Identifier of an uploaded file in the content store.
pub type FileId = i64;

/// Free-form extractor metadata. Values keep their JSON type so numeric
/// fields (page counts, durations) survive serialization untouched.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Outcome tag describing how much the extractor trusts the returned text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Succeeded,
    PartiallySucceeded,
    Failed,
}

/// A previously stored upload handed to the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub file_id: FileId,
    /// Location of the stored bytes on disk.
    pub path: PathBuf,
    /// Name the user uploaded the file under (used for extension lookup).
    pub original_name: String,
    pub mime_type: Option<String>,
}

impl UploadRecord {
    pub fn new(file_id: FileId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_id,
            path,
            original_name,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Lowercased extension of the original name, falling back to the stored path.
    pub fn extension(&self) -> Option<String> {
        let from_name = self
            .original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());
        from_name.or_else(|| {
            self.path
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        })
    }
}

/// Canonical, immutable result of normalizing one upload.
///
/// Re-processing a file produces a new value that supersedes the stored one;
/// an existing `ExtractedContent` is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedContent {
    pub source_file_id: FileId,
    pub raw_text: String,
    pub token_count: usize,
    pub extracted_assets: Vec<PathBuf>,
    pub metadata: Metadata,
    pub extraction_status: ExtractionStatus,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractedContent {
    /// A `Failed` record carrying the reason in its metadata.
    pub fn failed(source_file_id: FileId, reason: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(
            "failure_reason".to_string(),
            serde_json::Value::String(reason.into()),
        );
        Self {
            source_file_id,
            raw_text: String::new(),
            token_count: 0,
            extracted_assets: Vec::new(),
            metadata,
            extraction_status: ExtractionStatus::Failed,
            extracted_at: Utc::now(),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.extraction_status == ExtractionStatus::Succeeded
    }
}
