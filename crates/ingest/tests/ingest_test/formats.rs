use std::sync::Arc;

use serde_json::json;
use study_core::config::OcrConfig;
use study_core::{ContentStore, ExtractionStatus, UploadRecord};
use study_ingest::document::image::ImageExtractor;
use study_ingest::document::media::TRANSCRIPTION_UNAVAILABLE;
use study_ingest::document::powerpoint::PowerPointExtractor;
use study_ingest::{ExtractorRegistry, IngestError};

use crate::helpers::{
    make_normalizer, png_bytes, wav_bytes, write_docx, write_pdf, write_pptx, NoOcr,
};

fn registry_without_ocr() -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::with_defaults(&OcrConfig::default());
    registry.register(
        study_ingest::IMAGE_EXTENSIONS,
        Arc::new(ImageExtractor::new(Arc::new(NoOcr))),
    );
    registry
}

#[tokio::test]
async fn pdf_extraction_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lecture.pdf");
    write_pdf(&path, "Calculus Notes", "Hello derivatives");
    let (normalizer, _store) = make_normalizer(registry_without_ocr());

    let first = normalizer.normalize(&UploadRecord::new(1, &path)).await.unwrap();
    let second = normalizer.normalize(&UploadRecord::new(1, &path)).await.unwrap();

    assert_eq!(first.extraction_status, ExtractionStatus::Succeeded);
    assert!(first.raw_text.contains("Hello derivatives"));
    assert_eq!(first.raw_text, second.raw_text);
    assert_eq!(first.token_count, second.token_count);
    assert_eq!(first.metadata["title"], json!("Calculus Notes"));
    assert_eq!(first.metadata["author"], json!(""));
    assert_eq!(first.metadata["page_count"], json!(1));
}

#[tokio::test]
async fn corrupt_pdf_is_a_hard_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.extend((0u8..200).map(|b| b.wrapping_mul(37)));
    std::fs::write(&path, bytes).unwrap();
    let (normalizer, store) = make_normalizer(registry_without_ocr());

    let err = normalizer.normalize(&UploadRecord::new(2, &path)).await.unwrap_err();
    assert!(matches!(err, IngestError::HardExtraction { file_id: 2, .. }));

    let stored = store.get_extracted_content(2).await.unwrap().unwrap();
    assert_eq!(stored.extraction_status, ExtractionStatus::Failed);
}

#[tokio::test]
async fn docx_renders_paragraphs_tables_and_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("week3.docx");
    write_docx(&path);
    let (normalizer, _store) = make_normalizer(registry_without_ocr());

    let first = normalizer.normalize(&UploadRecord::new(3, &path)).await.unwrap();
    assert_eq!(first.extraction_status, ExtractionStatus::Succeeded);
    assert!(first.raw_text.starts_with("Derivatives measure change.\n"));
    assert!(first.raw_text.contains("Rule\tForm\n"));
    assert!(first.raw_text.contains("Power\tn x^(n-1)\n"));
    assert_eq!(first.metadata["title"], json!("Calculus Week 3"));
    assert_eq!(first.metadata["table_count"], json!(1));
    assert_eq!(first.metadata["image_count"], json!(1));

    assert_eq!(first.extracted_assets.len(), 1);
    let asset = &first.extracted_assets[0];
    assert_eq!(asset, &dir.path().join("images").join("week3_image1.png"));
    assert!(asset.exists());

    let again = normalizer.normalize(&UploadRecord::new(3, &path)).await.unwrap();
    assert_eq!(first.raw_text, again.raw_text);
    assert_eq!(first.token_count, again.token_count);
}

#[tokio::test]
async fn configured_asset_dir_receives_word_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("week3.docx");
    write_docx(&path);
    let assets = dir.path().join("assets");
    let registry = ExtractorRegistry::with_asset_dir(&OcrConfig::default(), &assets);
    let (normalizer, _store) = make_normalizer(registry);

    let content = normalizer.normalize(&UploadRecord::new(4, &path)).await.unwrap();

    assert_eq!(content.extracted_assets, vec![assets.join("week3_image1.png")]);
    assert!(content.extracted_assets[0].exists());
    assert!(!dir.path().join("images").exists());
}

#[tokio::test]
async fn legacy_doc_is_a_hard_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.doc");
    std::fs::write(&path, [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]).unwrap();
    let (normalizer, _store) = make_normalizer(registry_without_ocr());

    let err = normalizer.normalize(&UploadRecord::new(4, &path)).await.unwrap_err();
    assert!(matches!(err, IngestError::HardExtraction { .. }));
}

#[tokio::test]
async fn pptx_text_titles_and_image_relationships() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("biology.pptx");
    write_pptx(&path);

    let slides = PowerPointExtractor.slides(&path).await;
    assert_eq!(slides.len(), 2);
    assert_eq!(slides[0].number, 1);
    assert_eq!(slides[1].images, vec!["ppt/media/image1.png".to_string()]);

    let (normalizer, _store) = make_normalizer(registry_without_ocr());
    let content = normalizer.normalize(&UploadRecord::new(5, &path)).await.unwrap();
    assert_eq!(content.extraction_status, ExtractionStatus::Succeeded);
    assert_eq!(
        content.raw_text,
        "Cells\nCells are the unit of life.\nMitosis\nMitosis splits one nucleus into two."
    );
    assert_eq!(content.metadata["slide_count"], json!(2));
    assert_eq!(content.metadata["slide_titles"], json!(["Cells", "Mitosis"]));
    assert_eq!(content.metadata["image_relationships"], json!(["rId2"]));
}

#[tokio::test]
async fn corrupt_pptx_degrades_to_partial() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pptx");
    std::fs::write(&path, b"PK\x03\x04 truncated").unwrap();
    let (normalizer, _store) = make_normalizer(registry_without_ocr());

    let content = normalizer.normalize(&UploadRecord::new(6, &path)).await.unwrap();
    assert_eq!(content.extraction_status, ExtractionStatus::PartiallySucceeded);
    assert!(content.raw_text.is_empty());
    assert_eq!(content.metadata["slide_count"], json!(0));
}

#[tokio::test]
async fn placeholder_png_without_ocr_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("placeholder.png");
    std::fs::write(&path, png_bytes()).unwrap();
    let (normalizer, store) = make_normalizer(registry_without_ocr());

    let content = normalizer.normalize(&UploadRecord::new(7, &path)).await.unwrap();
    assert_eq!(content.extraction_status, ExtractionStatus::PartiallySucceeded);
    assert_eq!(content.token_count, 0);
    assert_eq!(content.metadata["format"], json!("png"));
    assert_eq!(content.metadata["width"], json!(1));
    assert_eq!(content.metadata["extractor"], json!("image"));
    assert!(store.get_extracted_content(7).await.unwrap().is_some());
}

#[tokio::test]
async fn audio_is_probed_but_not_transcribed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lecture.wav");
    std::fs::write(&path, wav_bytes(16_000, 1)).unwrap();
    let (normalizer, _store) = make_normalizer(registry_without_ocr());

    let content = normalizer.normalize(&UploadRecord::new(8, &path)).await.unwrap();
    assert_eq!(content.extraction_status, ExtractionStatus::PartiallySucceeded);
    assert_eq!(content.metadata["media_type"], json!("audio"));
    assert_eq!(content.metadata["sample_rate"], json!(16_000));
    assert_eq!(content.metadata["channels"], json!(1));
    assert_eq!(content.metadata["transcription"], json!(TRANSCRIPTION_UNAVAILABLE));
}

#[tokio::test]
async fn video_stubs_return_empty_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lecture.mp4");
    std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();
    let (normalizer, _store) = make_normalizer(registry_without_ocr());

    let content = normalizer.normalize(&UploadRecord::new(9, &path)).await.unwrap();
    assert_eq!(content.extraction_status, ExtractionStatus::PartiallySucceeded);
    assert!(content.extracted_assets.is_empty());
    assert_eq!(content.metadata["media_type"], json!("video"));
    assert_eq!(content.metadata["frames_extracted"], json!(0));
}
