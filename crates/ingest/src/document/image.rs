//! Image extraction: OCR text plus format, dimension, resolution and EXIF
//! metadata. Best-effort throughout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use study_core::Metadata;
use tracing::warn;

use super::ocr::{OcrEngine, TextRegion};
use super::{run_blocking, ExtractionError, Extractor, ExtractorKind};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

pub struct ImageExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl ImageExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Word-level OCR regions; empty when OCR is unavailable.
    pub async fn word_regions(&self, path: &Path) -> Vec<TextRegion> {
        match self.ocr.recognize(path).await {
            Ok(output) => output.regions,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "OCR unavailable, no word regions");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Extractor for ImageExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Image
    }

    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        match self.ocr.recognize(path).await {
            Ok(output) => Ok(output.text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "OCR failed, continuing without text");
                Ok(String::new())
            }
        }
    }

    async fn extract_assets(&self, _path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        Ok(Vec::new())
    }

    async fn extract_metadata(&self, path: &Path) -> Result<Metadata, ExtractionError> {
        let owned = path.to_path_buf();
        match run_blocking(move || read_image_metadata(&owned)).await {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read image metadata");
                Ok(Metadata::new())
            }
        }
    }
}

pub fn read_image_metadata(path: &Path) -> Result<Metadata, ExtractionError> {
    let image_error = |e: ::image::ImageError| ExtractionError::Image(e.to_string());

    let reader = ::image::ImageReader::open(path)?
        .with_guessed_format()?;
    let format = reader
        .format()
        .map(|f| format!("{f:?}").to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string());
    let (width, height) = reader.into_dimensions().map_err(image_error)?;
    let color = ::image::open(path).map_err(image_error)?.color();

    let bytes = std::fs::read(path)?;
    let (dpi_x, dpi_y) = match resolution(&bytes) {
        Some((x, y)) => (json!(x), json!(y)),
        None => (Value::Null, Value::Null),
    };
    let exif_size = exif_segment(&bytes).map(<[u8]>::len);

    let mut metadata = Metadata::new();
    metadata.insert("format".into(), Value::String(format));
    metadata.insert("width".into(), json!(width));
    metadata.insert("height".into(), json!(height));
    metadata.insert("color_type".into(), Value::String(format!("{color:?}")));
    metadata.insert("dpi_x".into(), dpi_x);
    metadata.insert("dpi_y".into(), dpi_y);
    metadata.insert("has_exif".into(), Value::Bool(exif_size.is_some()));
    metadata.insert("exif_size".into(), json!(exif_size.unwrap_or(0)));
    Ok(metadata)
}

// ── Container parsing ───────────────────────────────────────────────

/// JPEG marker segments (marker, payload) up to the start of scan.
fn jpeg_segments(bytes: &[u8]) -> Vec<(u8, &[u8])> {
    let mut segments = Vec::new();
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return segments;
    }
    let mut pos = 2;
    while pos + 4 <= bytes.len() && bytes[pos] == 0xFF {
        let marker = bytes[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > bytes.len() {
            break;
        }
        segments.push((marker, &bytes[pos + 4..end]));
        pos = end;
    }
    segments
}

/// PNG chunks (type, data).
fn png_chunks(bytes: &[u8]) -> Vec<([u8; 4], &[u8])> {
    let mut chunks = Vec::new();
    if !bytes.starts_with(PNG_SIGNATURE) {
        return chunks;
    }
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= bytes.len() {
        let len =
            u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
                as usize;
        let kind = [bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]];
        let start = pos + 8;
        let Some(end) = start.checked_add(len).filter(|end| *end <= bytes.len()) else {
            break;
        };
        chunks.push((kind, &bytes[start..end]));
        if &kind == b"IEND" {
            break;
        }
        pos = end + 4;
    }
    chunks
}

/// Dots per inch from a JFIF APP0 header or a PNG `pHYs` chunk.
fn resolution(bytes: &[u8]) -> Option<(f64, f64)> {
    for (marker, payload) in jpeg_segments(bytes) {
        if marker == 0xE0 && payload.len() >= 12 && payload.starts_with(b"JFIF\0") {
            let units = payload[7];
            let x = f64::from(u16::from_be_bytes([payload[8], payload[9]]));
            let y = f64::from(u16::from_be_bytes([payload[10], payload[11]]));
            return match units {
                1 => Some((x, y)),
                2 => Some((x * 2.54, y * 2.54)),
                _ => None,
            };
        }
    }
    for (kind, data) in png_chunks(bytes) {
        if &kind == b"pHYs" && data.len() >= 9 && data[8] == 1 {
            let x = f64::from(u32::from_be_bytes([data[0], data[1], data[2], data[3]]));
            let y = f64::from(u32::from_be_bytes([data[4], data[5], data[6], data[7]]));
            // Pixels per metre.
            return Some(((x * 0.0254).round(), (y * 0.0254).round()));
        }
    }
    None
}

/// Raw EXIF payload from a JPEG APP1 segment or a PNG `eXIf` chunk.
fn exif_segment(bytes: &[u8]) -> Option<&[u8]> {
    jpeg_segments(bytes)
        .into_iter()
        .find(|(marker, payload)| *marker == 0xE1 && payload.starts_with(b"Exif\0\0"))
        .map(|(_, payload)| &payload[6..])
        .or_else(|| {
            png_chunks(bytes)
                .into_iter()
                .find(|(kind, _)| kind == b"eXIf")
                .map(|(_, data)| data)
        })
}
