use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use study_core::config::OcrConfig;
use study_core::UploadRecord;
use tracing::debug;

use super::image::ImageExtractor;
use super::media::{MediaExtractor, AUDIO_EXTENSIONS, VIDEO_EXTENSIONS};
use super::ocr::TesseractCli;
use super::pdf::PdfExtractor;
use super::powerpoint::PowerPointExtractor;
use super::word::WordExtractor;
use super::{Extractor, ExtractorKind};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Extension-keyed extractor table, resolved once per upload.
///
/// Lookup is by the upload's normalized extension first; when the name has no
/// known extension the declared MIME type picks the extractor family.
#[derive(Default, Clone)]
pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn Extractor>>,
    by_kind: HashMap<ExtractorKind, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in extractors, writing sub-assets beside each source file.
    /// Legacy `.doc` and `.ppt` route to the OOXML extractors, which reject
    /// them (Word) or degrade (PowerPoint).
    pub fn with_defaults(ocr: &OcrConfig) -> Self {
        Self::built_in(ocr, PdfExtractor::new(), WordExtractor::new())
    }

    /// Built-in extractors with every PDF and Word sub-asset written under
    /// `asset_dir`.
    pub fn with_asset_dir(ocr: &OcrConfig, asset_dir: &Path) -> Self {
        Self::built_in(
            ocr,
            PdfExtractor::with_asset_dir(asset_dir),
            WordExtractor::with_asset_dir(asset_dir),
        )
    }

    fn built_in(ocr: &OcrConfig, pdf: PdfExtractor, word: WordExtractor) -> Self {
        let mut registry = Self::new();
        registry.register(&["pdf"], Arc::new(pdf));
        registry.register(&["docx", "doc"], Arc::new(word));
        registry.register(&["pptx", "ppt"], Arc::new(PowerPointExtractor));
        registry.register(
            IMAGE_EXTENSIONS,
            Arc::new(ImageExtractor::new(Arc::new(TesseractCli::new(ocr)))),
        );
        let media: Arc<dyn Extractor> = Arc::new(MediaExtractor);
        registry.register(AUDIO_EXTENSIONS, media.clone());
        registry.register(VIDEO_EXTENSIONS, media);
        registry
    }

    /// Route `extensions` to `extractor`, replacing earlier registrations.
    pub fn register(&mut self, extensions: &[&str], extractor: Arc<dyn Extractor>) {
        self.by_kind.entry(extractor.kind()).or_insert_with(|| extractor.clone());
        for ext in extensions {
            self.by_extension
                .insert(ext.trim_start_matches('.').to_ascii_lowercase(), extractor.clone());
        }
    }

    /// Declared extractor family for an extension.
    pub fn kind_for(&self, ext: &str) -> Option<ExtractorKind> {
        self.for_extension(ext).map(|e| e.kind())
    }

    pub fn for_extension(&self, ext: &str) -> Option<Arc<dyn Extractor>> {
        self.by_extension.get(&ext.to_ascii_lowercase()).cloned()
    }

    pub fn resolve(&self, upload: &UploadRecord) -> Option<Arc<dyn Extractor>> {
        if let Some(extractor) = upload.extension().and_then(|ext| self.for_extension(&ext)) {
            return Some(extractor);
        }
        let kind = upload.mime_type.as_deref().and_then(kind_for_mime)?;
        debug!(file_id = upload.file_id, kind = kind.as_str(), "resolved extractor from MIME type");
        self.by_kind.get(&kind).cloned()
    }

    pub fn supported_extensions(&self) -> BTreeSet<String> {
        self.by_extension.keys().cloned().collect()
    }
}

/// Extractor family for a MIME type.
pub fn kind_for_mime(mime: &str) -> Option<ExtractorKind> {
    let mime = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "application/pdf" => Some(ExtractorKind::Pdf),
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(ExtractorKind::Word)
        }
        "application/vnd.ms-powerpoint"
        | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Some(ExtractorKind::PowerPoint)
        }
        m if m.starts_with("image/") => Some(ExtractorKind::Image),
        m if m.starts_with("audio/") || m.starts_with("video/") => Some(ExtractorKind::Media),
        _ => None,
    }
}
