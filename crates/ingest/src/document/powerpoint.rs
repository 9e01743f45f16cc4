//! PPTX extraction. Best-effort: any failure is logged and yields empty output.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use serde_json::Value;
use study_core::Metadata;
use tracing::warn;

use super::ooxml::{self, Archive};
use super::{run_blocking, ExtractionError, Extractor, ExtractorKind};

const SLIDE_PREFIX: &str = "ppt/slides/slide";

pub struct PowerPointExtractor;

/// One rendered slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Slide {
    pub number: u32,
    pub title: Option<String>,
    pub text: String,
    /// Relationship ids of images referenced by the slide.
    pub image_rel_ids: Vec<String>,
    /// Archive-internal paths those relationships point at.
    pub images: Vec<String>,
}

#[async_trait]
impl Extractor for PowerPointExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::PowerPoint
    }

    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let slides = self.slides(path).await;
        Ok(slides
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn extract_assets(&self, path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let slides = self.slides(path).await;
        let mut assets: Vec<PathBuf> = Vec::new();
        for image in slides.into_iter().flat_map(|s| s.images) {
            let image = PathBuf::from(image);
            if !assets.contains(&image) {
                assets.push(image);
            }
        }
        Ok(assets)
    }

    async fn extract_metadata(&self, path: &Path) -> Result<Metadata, ExtractionError> {
        let owned = path.to_path_buf();
        let properties = run_blocking(move || {
            let mut archive = ooxml::open_archive(&owned)?;
            ooxml::core_properties(&mut archive)
        })
        .await
        .unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "failed to read presentation properties");
            Metadata::new()
        });

        let slides = self.slides(path).await;
        let mut metadata = properties;
        metadata.insert("slide_count".into(), Value::from(slides.len()));
        metadata.insert(
            "slide_titles".into(),
            Value::from(
                slides
                    .iter()
                    .filter_map(|s| s.title.clone())
                    .collect::<Vec<_>>(),
            ),
        );
        metadata.insert(
            "image_relationships".into(),
            Value::from(
                slides
                    .iter()
                    .flat_map(|s| s.image_rel_ids.iter().cloned())
                    .collect::<Vec<_>>(),
            ),
        );
        Ok(metadata)
    }
}

impl PowerPointExtractor {
    /// All slides in presentation order, or empty when the file cannot be read.
    pub async fn slides(&self, path: &Path) -> Vec<Slide> {
        let owned = path.to_path_buf();
        match run_blocking(move || read_slides(&owned)).await {
            Ok(slides) => slides,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read presentation");
                Vec::new()
            }
        }
    }
}

/// `ppt/slides/slide12.xml` -> 12.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

pub fn read_slides(path: &Path) -> Result<Vec<Slide>, ExtractionError> {
    let mut archive = ooxml::open_archive(path)?;
    let mut parts: Vec<(u32, String)> = ooxml::entry_names(&archive)
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    parts.sort_by_key(|(n, _)| *n);

    let mut slides = Vec::with_capacity(parts.len());
    for (number, part) in parts {
        slides.push(read_slide(&mut archive, number, &part)?);
    }
    Ok(slides)
}

fn read_slide(archive: &mut Archive, number: u32, part: &str) -> Result<Slide, ExtractionError> {
    let xml = ooxml::read_entry(archive, part)?.unwrap_or_default();
    let (file_dir, file_name) = part.rsplit_once('/').unwrap_or(("", part));
    let rels_part = format!("{file_dir}/_rels/{file_name}.rels");
    let rels = match ooxml::read_entry(archive, &rels_part)? {
        Some(rels_xml) => ooxml::relationships(&rels_xml)?,
        None => HashMap::new(),
    };

    let mut slide = render_slide(&xml)?;
    slide.number = number;
    slide.images = slide
        .image_rel_ids
        .iter()
        .filter_map(|rel_id| rels.get(rel_id))
        .map(|target| ooxml::resolve_target(part, target))
        .collect();
    Ok(slide)
}

/// Text runs joined per `a:p` paragraph, plus the `r:embed` ids of any
/// pictures.
fn render_slide(xml: &str) -> Result<Slide, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut slide = Slide::default();
    let mut paragraph = String::new();
    let mut lines: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(ooxml::xml_error)? {
            Event::Start(e) if e.name().as_ref() == b"a:t" => in_text = true,
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"a:blip" => {
                if let Some(id) = ooxml::attribute(&e, b"r:embed") {
                    slide.image_rel_ids.push(id);
                }
            }
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(ooxml::xml_error)?;
                if slide.title.is_none() && !text.trim().is_empty() {
                    slide.title = Some(text.trim().to_string());
                }
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" => {
                    let line = std::mem::take(&mut paragraph);
                    if !line.trim().is_empty() {
                        lines.push(line);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    slide.text = lines.join("\n");
    Ok(slide)
}
