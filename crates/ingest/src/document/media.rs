//! Audio and video files. Audio is probed for stream parameters; transcription
//! and video decoding are unsupported and report empty results.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use study_core::Metadata;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::warn;

use super::{extension_of, run_blocking, ExtractionError, Extractor, ExtractorKind};

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm", "mkv", "m4v"];

/// Returned by [`MediaExtractor::transcribe_audio`] until a speech engine is wired in.
pub const TRANSCRIPTION_UNAVAILABLE: &str = "[audio transcription not implemented]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = extension_of(path);
        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Stream parameters of the default audio track.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioInfo {
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
    pub bits_per_sample: Option<u32>,
    pub duration_seconds: Option<f64>,
}

pub struct MediaExtractor;

impl MediaExtractor {
    /// Speech-to-text is not available; always the fixed sentinel.
    pub async fn transcribe_audio(&self, path: &Path) -> String {
        warn!(
            path = %path.display(),
            "audio transcription needs a speech-to-text engine; none is configured"
        );
        TRANSCRIPTION_UNAVAILABLE.to_string()
    }

    /// Needs an external transcoder; always empty.
    pub async fn extract_video_audio(&self, path: &Path) -> Option<PathBuf> {
        warn!(
            path = %path.display(),
            transcoder = "ffmpeg",
            "video audio extraction needs an external transcoder; skipped"
        );
        None
    }

    /// Needs an external transcoder; always empty.
    pub async fn extract_video_frames(&self, path: &Path, _interval_secs: u32) -> Vec<PathBuf> {
        warn!(
            path = %path.display(),
            transcoder = "ffmpeg",
            "video frame extraction needs an external transcoder; skipped"
        );
        Vec::new()
    }
}

#[async_trait]
impl Extractor for MediaExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Media
    }

    /// Media carries no directly extractable text.
    async fn extract_text(&self, _path: &Path) -> Result<String, ExtractionError> {
        Ok(String::new())
    }

    async fn extract_assets(&self, path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        if MediaKind::from_path(path) == Some(MediaKind::Video) {
            return Ok(self.extract_video_frames(path, 30).await);
        }
        Ok(Vec::new())
    }

    async fn extract_metadata(&self, path: &Path) -> Result<Metadata, ExtractionError> {
        let Some(kind) = MediaKind::from_path(path) else {
            warn!(path = %path.display(), "not a recognised media extension");
            return Ok(Metadata::new());
        };

        let mut metadata = Metadata::new();
        metadata.insert("media_type".into(), Value::String(kind.as_str().into()));
        match std::fs::metadata(path) {
            Ok(meta) => {
                metadata.insert("file_size".into(), json!(meta.len()));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat media file");
                return Ok(Metadata::new());
            }
        }

        match kind {
            MediaKind::Audio => {
                let owned = path.to_path_buf();
                match run_blocking(move || probe_audio(&owned)).await {
                    Ok(info) => {
                        metadata.insert("codec".into(), json!(info.codec));
                        metadata.insert("sample_rate".into(), json!(info.sample_rate));
                        metadata.insert("channels".into(), json!(info.channels));
                        metadata.insert("bits_per_sample".into(), json!(info.bits_per_sample));
                        metadata.insert("duration_seconds".into(), json!(info.duration_seconds));
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to probe audio"),
                }
                let transcript = self.transcribe_audio(path).await;
                metadata.insert("transcription".into(), Value::String(transcript));
            }
            MediaKind::Video => {
                metadata.insert("audio_track_extracted".into(), Value::Bool(false));
                metadata.insert("frames_extracted".into(), json!(0));
            }
        }
        Ok(metadata)
    }
}

pub fn probe_audio(path: &Path) -> Result<AudioInfo, ExtractionError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    let ext = extension_of(path);
    if !ext.is_empty() {
        hint.with_extension(&ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ExtractionError::Media(format!("probe: {e}")))?;
    let track = probed
        .format
        .default_track()
        .ok_or_else(|| ExtractionError::Media("no audio track found".into()))?;
    let params = &track.codec_params;

    let codec = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name.to_string());
    let duration_seconds = match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / f64::from(rate)),
        _ => None,
    };

    Ok(AudioInfo {
        codec,
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count()),
        bits_per_sample: params.bits_per_sample,
        duration_seconds,
    })
}
