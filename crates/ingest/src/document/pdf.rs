//! PDF extraction via `lopdf`, with `pdf-extract` as a whole-document
//! fallback when per-page extraction yields nothing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde_json::Value;
use study_core::Metadata;
use tracing::{debug, warn};

use super::{
    asset_dir_for, file_stem, run_blocking, ExtractionError, Extractor, ExtractorKind,
};

/// Info dictionary fields copied into metadata (PDF key, metadata key).
const INFO_FIELDS: &[(&[u8], &str)] = &[
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Producer", "producer"),
    (b"Creator", "creator"),
    (b"CreationDate", "creation_date"),
    (b"ModDate", "modification_date"),
];

/// Embedded images go to `asset_dir` when set, otherwise beside the PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    asset_dir: Option<PathBuf>,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: Some(dir.into()),
        }
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Pdf
    }

    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let path = path.to_path_buf();
        run_blocking(move || extract_pdf_text(&path)).await
    }

    async fn extract_assets(&self, path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let path = path.to_path_buf();
        let out_dir = asset_dir_for(&path, self.asset_dir.as_deref(), None);
        run_blocking(move || extract_pdf_images(&path, &out_dir)).await
    }

    async fn extract_metadata(&self, path: &Path) -> Result<Metadata, ExtractionError> {
        let path = path.to_path_buf();
        run_blocking(move || extract_pdf_metadata(&path)).await
    }
}

fn load(path: &Path) -> Result<(Document, Vec<u8>), ExtractionError> {
    let bytes = std::fs::read(path)?;
    let doc = Document::load_mem(&bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    if doc.get_pages().is_empty() {
        return Err(ExtractionError::Pdf("document has no pages".into()));
    }
    Ok((doc, bytes))
}

/// Concatenate per-page text in page order.
pub fn extract_pdf_text(path: &Path) -> Result<String, ExtractionError> {
    let (doc, bytes) = load(path)?;

    let mut text = String::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                if !page_text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Err(e) => warn!(
                path = %path.display(),
                page = page_number,
                error = %e,
                "failed to extract PDF page text"
            ),
        }
    }

    if text.trim().is_empty() {
        // Some encodings defeat lopdf's decoder; pdf-extract handles more of them.
        match pdf_extract::extract_text_from_mem(&bytes) {
            Ok(fallback) => {
                debug!(path = %path.display(), chars = fallback.len(), "used pdf-extract fallback");
                return Ok(fallback);
            }
            Err(e) => debug!(path = %path.display(), error = %e, "pdf-extract fallback failed"),
        }
    }

    Ok(text)
}

/// Document info fields (empty string when absent) plus page count and
/// encryption flag.
pub fn extract_pdf_metadata(path: &Path) -> Result<Metadata, ExtractionError> {
    let (doc, _) = load(path)?;

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(&doc, obj))
        .and_then(|obj| match obj {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        });

    let mut metadata = Metadata::new();
    for (pdf_key, key) in INFO_FIELDS {
        let value = info
            .and_then(|dict| dict.get(pdf_key).ok())
            .and_then(|obj| resolve(&doc, obj))
            .and_then(object_to_string)
            .unwrap_or_default();
        metadata.insert(key.to_string(), Value::String(value));
    }
    metadata.insert("page_count".into(), Value::from(doc.get_pages().len()));
    metadata.insert("encrypted".into(), Value::Bool(doc.is_encrypted()));
    Ok(metadata)
}

/// Write embedded raster images into `out_dir` as
/// `{stem}_page{page}_img{index}.{ext}`.
pub fn extract_pdf_images(path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let (doc, _) = load(path)?;
    let stem = file_stem(path);

    let mut written = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        for (index, stream) in page_images(&doc, page_id).into_iter().enumerate() {
            if written.is_empty() {
                std::fs::create_dir_all(out_dir)?;
            }
            let target_base = out_dir.join(format!("{stem}_page{page_number}_img{index}"));
            match write_image(stream, &target_base) {
                Ok(Some(target)) => written.push(target),
                Ok(None) => {
                    debug!(page = page_number, index, "skipped image with unsupported encoding")
                }
                Err(e) => warn!(page = page_number, index, error = %e, "failed to write PDF image"),
            }
        }
    }
    Ok(written)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn object_to_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// PDF text strings are either UTF-16BE with a BOM or PDFDocEncoding
/// (treated as Latin-1 here).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Image XObjects reachable from a page's resources, walking up the page
/// tree for inherited resources.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<&lopdf::Stream> {
    let mut images = Vec::new();
    let mut node = doc.get_dictionary(page_id).ok();
    while let Some(dict) = node {
        if let Some(xobjects) = dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok())
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok())
        {
            for (_, obj) in xobjects.iter() {
                if let Some(Object::Stream(stream)) = resolve(doc, obj) {
                    if name_of(&stream.dict, b"Subtype").as_deref() == Some(b"Image".as_slice()) {
                        images.push(stream);
                    }
                }
            }
            break;
        }
        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok());
    }
    images
}

fn name_of(dict: &Dictionary, key: &[u8]) -> Option<Vec<u8>> {
    match dict.get(key).ok()? {
        Object::Name(name) => Some(name.clone()),
        Object::Array(items) => items.iter().find_map(|item| match item {
            Object::Name(name) => Some(name.clone()),
            _ => None,
        }),
        _ => None,
    }
}

fn integer_of(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key).ok()? {
        Object::Integer(v) => u32::try_from(*v).ok(),
        _ => None,
    }
}

/// Encoded images (JPEG, JPEG 2000) are written verbatim; raw 8-bit RGB or
/// grayscale bitmaps are re-encoded as PNG. Anything else is skipped.
fn write_image(
    stream: &lopdf::Stream,
    target_base: &Path,
) -> Result<Option<PathBuf>, ExtractionError> {
    let filter = name_of(&stream.dict, b"Filter");
    match filter.as_deref() {
        Some(b"DCTDecode") => {
            let target = target_base.with_extension("jpg");
            std::fs::write(&target, &stream.content)?;
            return Ok(Some(target));
        }
        Some(b"JPXDecode") => {
            let target = target_base.with_extension("jp2");
            std::fs::write(&target, &stream.content)?;
            return Ok(Some(target));
        }
        _ => {}
    }

    let (Some(width), Some(height)) = (
        integer_of(&stream.dict, b"Width"),
        integer_of(&stream.dict, b"Height"),
    ) else {
        return Ok(None);
    };
    if integer_of(&stream.dict, b"BitsPerComponent") != Some(8) {
        return Ok(None);
    }

    let data = if filter.is_some() {
        stream
            .decompressed_content()
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?
    } else {
        stream.content.clone()
    };

    let target = target_base.with_extension("png");
    let pixels = width as usize * height as usize;
    let saved = match name_of(&stream.dict, b"ColorSpace").as_deref() {
        Some(b"DeviceRGB") if data.len() == pixels * 3 => {
            ::image::RgbImage::from_raw(width, height, data).map(|img| img.save(&target))
        }
        Some(b"DeviceGray") if data.len() == pixels => {
            ::image::GrayImage::from_raw(width, height, data).map(|img| img.save(&target))
        }
        _ => None,
    };

    match saved {
        Some(Ok(())) => Ok(Some(target)),
        Some(Err(e)) => Err(ExtractionError::Image(e.to_string())),
        None => Ok(None),
    }
}
