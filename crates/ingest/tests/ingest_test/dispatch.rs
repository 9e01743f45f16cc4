use std::sync::Arc;

use study_core::config::OcrConfig;
use study_core::{ContentStore, ExtractionStatus, UploadRecord};
use study_ingest::{kind_for_mime, ExtractorKind, ExtractorRegistry};

use crate::helpers::{make_normalizer, CountingExtractor};

#[test]
fn every_supported_extension_maps_to_its_family() {
    let registry = ExtractorRegistry::with_defaults(&OcrConfig::default());
    let expected = [
        ("pdf", ExtractorKind::Pdf),
        ("docx", ExtractorKind::Word),
        ("doc", ExtractorKind::Word),
        ("pptx", ExtractorKind::PowerPoint),
        ("ppt", ExtractorKind::PowerPoint),
        ("jpeg", ExtractorKind::Image),
        ("png", ExtractorKind::Image),
        ("bmp", ExtractorKind::Image),
        ("flac", ExtractorKind::Media),
        ("m4a", ExtractorKind::Media),
        ("webm", ExtractorKind::Media),
        ("m4v", ExtractorKind::Media),
    ];
    for (ext, kind) in expected {
        assert_eq!(registry.kind_for(ext), Some(kind), "extension {ext}");
        assert_eq!(registry.for_extension(ext).unwrap().kind(), kind);
    }
    assert!(registry.kind_for("txt").is_none());
    assert!(registry.supported_extensions().contains("wma"));
}

#[test]
fn mime_types_map_to_families() {
    assert_eq!(kind_for_mime("application/pdf"), Some(ExtractorKind::Pdf));
    assert_eq!(kind_for_mime("image/gif"), Some(ExtractorKind::Image));
    assert_eq!(kind_for_mime("audio/mpeg"), Some(ExtractorKind::Media));
    assert_eq!(kind_for_mime("text/plain"), None);
}

#[tokio::test]
async fn unsupported_extension_fails_without_extracting() {
    let counting = Arc::new(CountingExtractor::default());
    let mut registry = ExtractorRegistry::new();
    registry.register(&["pdf"], counting.clone());
    let (normalizer, store) = make_normalizer(registry);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.xyz");
    std::fs::write(&path, b"plain words").unwrap();

    let content = normalizer.normalize(&UploadRecord::new(5, &path)).await.unwrap();
    assert_eq!(content.extraction_status, ExtractionStatus::Failed);
    assert_eq!(counting.calls(), 0);

    let stored = store.get_extracted_content(5).await.unwrap().unwrap();
    assert_eq!(stored.extraction_status, ExtractionStatus::Failed);
    assert!(stored.metadata["failure_reason"]
        .as_str()
        .unwrap()
        .contains("xyz"));
}

#[tokio::test]
async fn registered_extension_reaches_its_extractor() {
    let counting = Arc::new(CountingExtractor::default());
    let mut registry = ExtractorRegistry::new();
    registry.register(&["pdf"], counting.clone());
    let (normalizer, _store) = make_normalizer(registry);

    let upload = UploadRecord::new(6, "/uploads/anything.PDF");
    let content = normalizer.normalize(&upload).await.unwrap();
    assert_eq!(counting.calls(), 1);
    assert_eq!(content.raw_text, "counted");
    assert_eq!(content.extraction_status, ExtractionStatus::Succeeded);
    assert_eq!(content.metadata["extractor"], "pdf");
}

#[tokio::test]
async fn mime_type_picks_extractor_when_name_has_no_extension() {
    let counting = Arc::new(CountingExtractor::default());
    let mut registry = ExtractorRegistry::new();
    registry.register(&["pdf"], counting.clone());
    let (normalizer, _store) = make_normalizer(registry);

    let upload = UploadRecord::new(7, "/uploads/blob").with_mime_type("application/pdf");
    let content = normalizer.normalize(&upload).await.unwrap();
    assert_eq!(counting.calls(), 1);
    assert_eq!(content.extraction_status, ExtractionStatus::Succeeded);
}
