//! Optical character recognition behind a small trait, with a Tesseract
//! command-line implementation.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use study_core::config::OcrConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use super::ExtractionError;

/// One recognised word with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRegion {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    /// 0-100 as reported by the engine.
    pub confidence: f32,
}

/// Recognised text of an image plus the word regions it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OcrOutput {
    pub text: String,
    pub regions: Vec<TextRegion>,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<OcrOutput, ExtractionError>;
}

/// Runs `tesseract <image> stdout -l <lang> tsv`.
pub struct TesseractCli {
    binary: String,
    language: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_binary.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, image: &Path) -> Result<OcrOutput, ExtractionError> {
        let child = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.language, "tsv"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractionError::Ocr(format!("failed to run {}: {e}", self.binary)))?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExtractionError::Ocr(format!("{} failed: {e}", self.binary)));
            }
            Err(_) => {
                warn!(
                    binary = %self.binary,
                    image = %image.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "OCR timed out"
                );
                return Err(ExtractionError::Ocr(format!(
                    "{} timed out after {}s",
                    self.binary,
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "{} failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let parsed = parse_tsv(&tsv);
        debug!(image = %image.display(), words = parsed.regions.len(), "OCR complete");
        Ok(parsed)
    }
}

/// Parse Tesseract TSV. Word rows (level 5) become regions; text is
/// rebuilt with one output line per (block, paragraph, line) triple.
pub fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut output = OcrOutput::default();
    let mut current_line: Option<(u32, u32, u32)> = None;
    let mut line_words: Vec<String> = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let num = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let line_key = (num(2), num(3), num(4));

        if current_line != Some(line_key) {
            if !line_words.is_empty() {
                lines.push(line_words.join(" "));
                line_words.clear();
            }
            current_line = Some(line_key);
        }
        line_words.push(text.to_string());

        output.regions.push(TextRegion {
            text: text.to_string(),
            left: num(6),
            top: num(7),
            width: num(8),
            height: num(9),
            confidence: cols[10].parse::<f32>().unwrap_or(-1.0),
        });
    }
    if !line_words.is_empty() {
        lines.push(line_words.join(" "));
    }

    output.text = lines.join("\n");
    output
}
