//! Turns an upload into one canonical [`ExtractedContent`] record.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use study_core::{
    Classify, ContentStore, ErrorClass, ExtractedContent, ExtractionStatus, FileId, Metadata,
    StoreError, UploadRecord,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::document::{ExtractionError, ExtractorRegistry};
use crate::tokens::count_tokens;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The file could not be opened or parsed at all. A `Failed` record has
    /// already been stored for it.
    #[error("extraction failed for file {file_id}: {source}")]
    HardExtraction {
        file_id: FileId,
        #[source]
        source: ExtractionError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for IngestError {
    fn class(&self) -> ErrorClass {
        match self {
            IngestError::HardExtraction { .. } => ErrorClass::Fatal,
            IngestError::Store(e) => e.class(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            IngestError::HardExtraction { .. } => {
                "The file could not be read. It may be corrupt or password protected".into()
            }
            IngestError::Store(e) => e.user_message(),
        }
    }
}

pub struct ContentNormalizer {
    registry: ExtractorRegistry,
    store: Arc<dyn ContentStore>,
}

impl ContentNormalizer {
    pub fn new(registry: ExtractorRegistry, store: Arc<dyn ContentStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Extract, build and persist the canonical record for `upload`.
    ///
    /// Unsupported types produce a stored `Failed` record without touching
    /// any extractor. Hard extraction failures are stored as `Failed` and
    /// then returned as errors. Re-running on the same file replaces the
    /// stored record with an equivalent one.
    pub async fn normalize(&self, upload: &UploadRecord) -> Result<ExtractedContent, IngestError> {
        let file_id = upload.file_id;

        let Some(extractor) = self.registry.resolve(upload) else {
            let ext = upload.extension().unwrap_or_default();
            warn!(file_id, extension = %ext, "unsupported file type");
            let shown = if ext.is_empty() { "<none>".to_string() } else { ext };
            let content = ExtractedContent::failed(
                file_id,
                ExtractionError::UnsupportedType(shown).to_string(),
            );
            self.store.save_extracted_content(file_id, &content).await?;
            return Ok(content);
        };

        let kind = extractor.kind();
        let path = upload.path.as_path();

        let raw_text = match extractor.extract_text(path).await {
            Ok(text) => text,
            Err(e) if kind.is_best_effort() => {
                warn!(file_id, kind = kind.as_str(), error = %e, "text extraction degraded");
                String::new()
            }
            Err(e) => {
                warn!(file_id, kind = kind.as_str(), error = %e, "text extraction failed");
                let content = ExtractedContent::failed(file_id, e.to_string());
                self.store.save_extracted_content(file_id, &content).await?;
                return Err(IngestError::HardExtraction { file_id, source: e });
            }
        };

        let (assets, metadata) = tokio::join!(
            extractor.extract_assets(path),
            extractor.extract_metadata(path)
        );
        let extracted_assets = assets.unwrap_or_else(|e| {
            warn!(file_id, kind = kind.as_str(), error = %e, "asset extraction failed");
            Vec::new()
        });
        let mut metadata = metadata.unwrap_or_else(|e| {
            warn!(file_id, kind = kind.as_str(), error = %e, "metadata extraction failed");
            Metadata::new()
        });
        metadata.insert("extractor".into(), Value::String(kind.as_str().into()));
        metadata.insert("file_name".into(), Value::String(upload.original_name.clone()));
        metadata.insert(
            "extension".into(),
            Value::String(upload.extension().unwrap_or_default()),
        );

        let extraction_status = if raw_text.trim().is_empty() {
            ExtractionStatus::PartiallySucceeded
        } else {
            ExtractionStatus::Succeeded
        };

        let content = ExtractedContent {
            source_file_id: file_id,
            token_count: count_tokens(&raw_text),
            raw_text,
            extracted_assets,
            metadata,
            extraction_status,
            extracted_at: Utc::now(),
        };
        self.store.save_extracted_content(file_id, &content).await?;

        info!(
            file_id,
            kind = kind.as_str(),
            status = ?content.extraction_status,
            tokens = content.token_count,
            assets = content.extracted_assets.len(),
            "normalized upload"
        );
        Ok(content)
    }
}
