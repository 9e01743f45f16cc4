//! DOCX extraction: walk `word/document.xml`, render paragraphs and tables,
//! copy embedded media into the asset directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::Value;
use study_core::Metadata;
use tracing::debug;

use super::ooxml::{self, ContentTypes};
use super::{
    asset_dir_for, file_stem, run_blocking, ExtractionError, Extractor, ExtractorKind,
};

const DOCUMENT_PART: &str = "word/document.xml";
const MEDIA_PREFIX: &str = "word/media/";

/// Embedded media goes to `asset_dir` when set, otherwise to `images/`
/// beside the document.
#[derive(Debug, Clone, Default)]
pub struct WordExtractor {
    asset_dir: Option<PathBuf>,
}

impl WordExtractor {
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
impl Extractor for WordExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Word
    }

    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let path = path.to_path_buf();
        run_blocking(move || Ok(read_body(&path)?.text)).await
    }

    async fn extract_assets(&self, path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let path = path.to_path_buf();
        let out_dir = asset_dir_for(&path, self.asset_dir.as_deref(), Some("images"));
        run_blocking(move || extract_word_images(&path, &out_dir)).await
    }

    async fn extract_metadata(&self, path: &Path) -> Result<Metadata, ExtractionError> {
        let path = path.to_path_buf();
        run_blocking(move || extract_word_metadata(&path)).await
    }
}

/// Rendered body plus structural counts.
#[derive(Debug, Default, PartialEq)]
pub struct WordBody {
    pub text: String,
    pub paragraph_count: usize,
    pub table_count: usize,
}

fn word_error(e: ExtractionError) -> ExtractionError {
    match e {
        ExtractionError::Word(_) | ExtractionError::Io(_) => e,
        other => ExtractionError::Word(other.to_string()),
    }
}

pub fn read_body(path: &Path) -> Result<WordBody, ExtractionError> {
    let mut archive = ooxml::open_archive(path).map_err(word_error)?;
    let xml = ooxml::read_entry(&mut archive, DOCUMENT_PART)
        .map_err(word_error)?
        .ok_or_else(|| ExtractionError::Word(format!("{DOCUMENT_PART} missing")))?;
    render_body(&xml).map_err(word_error)
}

/// One open table: finished cells of the current row plus the cell being filled.
#[derive(Default)]
struct TableFrame {
    row: Vec<String>,
    cell: String,
}

/// Paragraphs end with a newline; table rows render their cells
/// tab-separated followed by a newline. Nested tables render into the
/// enclosing cell.
pub fn render_body(xml: &str) -> Result<WordBody, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut body = WordBody::default();
    let mut tables: Vec<TableFrame> = Vec::new();
    let mut in_text = false;

    fn sink<'a>(out: &'a mut String, tables: &'a mut [TableFrame]) -> &'a mut String {
        match tables.last_mut() {
            Some(frame) => &mut frame.cell,
            None => out,
        }
    }

    loop {
        match reader.read_event().map_err(ooxml::xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tbl" => {
                    body.table_count += 1;
                    tables.push(TableFrame::default());
                }
                b"w:tr" => {
                    if let Some(frame) = tables.last_mut() {
                        frame.row.clear();
                    }
                }
                b"w:tc" => {
                    if let Some(frame) = tables.last_mut() {
                        frame.cell.clear();
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => sink(&mut body.text, &mut tables).push('\t'),
                b"w:br" | b"w:cr" => sink(&mut body.text, &mut tables).push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(ooxml::xml_error)?;
                sink(&mut body.text, &mut tables).push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    body.paragraph_count += 1;
                    match tables.last_mut() {
                        // Paragraphs inside a cell are joined with spaces.
                        Some(frame) => {
                            if !frame.cell.is_empty() && !frame.cell.ends_with(' ') {
                                frame.cell.push(' ');
                            }
                        }
                        None => body.text.push('\n'),
                    }
                }
                b"w:tc" => {
                    if let Some(frame) = tables.last_mut() {
                        let cell = std::mem::take(&mut frame.cell);
                        frame.row.push(cell.trim().to_string());
                    }
                }
                b"w:tr" => {
                    if let Some(frame) = tables.last_mut() {
                        let line = frame.row.join("\t");
                        frame.row.clear();
                        let out = match tables.len() {
                            1 => &mut body.text,
                            n => &mut tables[n - 2].cell,
                        };
                        out.push_str(&line);
                        out.push('\n');
                    }
                }
                b"w:tbl" => {
                    tables.pop();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}

/// Copy `word/media/*` into `out_dir` with an extension derived from the
/// part's content type.
pub fn extract_word_images(path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = ooxml::open_archive(path).map_err(word_error)?;
    let content_types = ContentTypes::load(&mut archive).map_err(word_error)?;

    let media: Vec<String> = ooxml::entry_names(&archive)
        .into_iter()
        .filter(|name| name.starts_with(MEDIA_PREFIX) && !name.ends_with('/'))
        .collect();
    if media.is_empty() {
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(out_dir)?;

    let stem = file_stem(path);
    let mut written = Vec::with_capacity(media.len());
    for (index, part) in media.iter().enumerate() {
        let content_type = content_types.content_type_of(part);
        if !content_type.unwrap_or("image/").starts_with("image/") {
            debug!(part = %part, "skipping non-image media part");
            continue;
        }
        let ext = ooxml::image_extension(content_type);
        let bytes = ooxml::read_entry_bytes(&mut archive, part).map_err(word_error)?;
        let target = out_dir.join(format!("{stem}_image{}.{ext}", index + 1));
        std::fs::write(&target, bytes)?;
        written.push(target);
    }
    Ok(written)
}

pub fn extract_word_metadata(path: &Path) -> Result<Metadata, ExtractionError> {
    let body = read_body(path)?;
    let mut archive = ooxml::open_archive(path).map_err(word_error)?;
    let mut metadata = ooxml::core_properties(&mut archive).map_err(word_error)?;
    let image_count = ooxml::entry_names(&archive)
        .iter()
        .filter(|name| name.starts_with(MEDIA_PREFIX) && !name.ends_with('/'))
        .count();

    metadata.insert("paragraph_count".into(), Value::from(body.paragraph_count));
    metadata.insert("table_count".into(), Value::from(body.table_count));
    metadata.insert("image_count".into(), Value::from(image_count));
    Ok(metadata)
}
