//! Shared plumbing for the ZIP + XML based Office formats (DOCX, PPTX).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use study_core::Metadata;
use zip::ZipArchive;

use super::ExtractionError;

pub(crate) type Archive = ZipArchive<File>;

pub(crate) fn open_archive(path: &Path) -> Result<Archive, ExtractionError> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| ExtractionError::Archive(e.to_string()))
}

/// Read a UTF-8 entry, `None` when the entry does not exist.
pub(crate) fn read_entry(
    archive: &mut Archive,
    name: &str,
) -> Result<Option<String>, ExtractionError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractionError::Archive(e.to_string())),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

pub(crate) fn read_entry_bytes(
    archive: &mut Archive,
    name: &str,
) -> Result<Vec<u8>, ExtractionError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ExtractionError::Archive(format!("{name}: {e}")))?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

pub(crate) fn entry_names(archive: &Archive) -> Vec<String> {
    archive.file_names().map(str::to_string).collect()
}

pub(crate) fn xml_error(e: quick_xml::Error) -> ExtractionError {
    ExtractionError::Xml(e.to_string())
}

/// Value of attribute `key` (qualified name) on an element.
pub(crate) fn attribute(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Title/author/subject/dates from `docProps/core.xml`. Missing fields are
/// reported as empty strings.
pub(crate) fn core_properties(archive: &mut Archive) -> Result<Metadata, ExtractionError> {
    const FIELDS: &[(&[u8], &str)] = &[
        (b"dc:title", "title"),
        (b"dc:creator", "author"),
        (b"dc:subject", "subject"),
        (b"cp:keywords", "keywords"),
        (b"cp:lastModifiedBy", "last_modified_by"),
        (b"dcterms:created", "created"),
        (b"dcterms:modified", "modified"),
    ];

    let mut metadata: Metadata = FIELDS
        .iter()
        .map(|(_, key)| (key.to_string(), serde_json::Value::String(String::new())))
        .collect();

    let Some(xml) = read_entry(archive, "docProps/core.xml")? else {
        return Ok(metadata);
    };

    let mut reader = Reader::from_str(&xml);
    let mut current: Option<&str> = None;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                current = FIELDS
                    .iter()
                    .find(|(tag, _)| e.name().as_ref() == *tag)
                    .map(|(_, key)| *key);
            }
            Event::Text(t) => {
                if let Some(key) = current {
                    let text = t.unescape().map_err(xml_error)?;
                    metadata.insert(
                        key.to_string(),
                        serde_json::Value::String(text.trim().to_string()),
                    );
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(metadata)
}

/// `[Content_Types].xml`: default types by extension plus per-part overrides.
#[derive(Debug, Default)]
pub(crate) struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub(crate) fn load(archive: &mut Archive) -> Result<Self, ExtractionError> {
        let mut types = ContentTypes::default();
        let Some(xml) = read_entry(archive, "[Content_Types].xml")? else {
            return Ok(types);
        };
        let mut reader = Reader::from_str(&xml);
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Empty(e) | Event::Start(e) => match e.local_name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(ct)) =
                            (attribute(&e, b"Extension"), attribute(&e, b"ContentType"))
                        {
                            types.defaults.insert(ext.to_ascii_lowercase(), ct);
                        }
                    }
                    b"Override" => {
                        if let (Some(part), Some(ct)) =
                            (attribute(&e, b"PartName"), attribute(&e, b"ContentType"))
                        {
                            types.overrides.insert(part.trim_start_matches('/').to_string(), ct);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(types)
    }

    pub(crate) fn content_type_of(&self, part: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(part) {
            return Some(ct);
        }
        let ext = part.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }
}

/// File extension for an image content type; unknown types default to jpg.
pub(crate) fn image_extension(content_type: Option<&str>) -> &'static str {
    match content_type.unwrap_or_default() {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" | "image/x-ms-bmp" => "bmp",
        _ => "jpg",
    }
}

/// Relationship id -> target map from a `_rels/*.rels` part.
pub(crate) fn relationships(xml: &str) -> Result<HashMap<String, String>, ExtractionError> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Resolve a relationship target relative to the directory of `base_part`.
pub(crate) fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_part.split('/').collect();
    segments.pop();
    for piece in target.split('/') {
        match piece {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}
