//! ingest-worker: normalize uploaded files and report their difficulty.
//!
//! Each file runs through the extractor registry and the content normalizer;
//! usable text is then scored by the difficulty analyzer. One JSON object per
//! file is printed to stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use study_compute::{analyze, ComplexityBreakdown};
use study_core::config::{self, Config};
use study_core::{
    Classify, ContentDifficultyAnalysis, ExtractedContent, ExtractionStatus, FileId,
    MemoryContentStore, UploadRecord,
};
use study_ingest::{ContentNormalizer, ExtractorRegistry};

// ── CLI ─────────────────────────────────────────────────────────────

/// Extract text, assets and metadata from study material.
#[derive(Parser, Debug)]
#[command(name = "ingest-worker", version, about)]
struct Cli {
    /// Files to normalize. Relative paths that do not exist are looked up
    /// under the configured upload directory.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// File id assigned to the first file; later files count up from it.
    #[arg(long, default_value_t = 1)]
    first_id: FileId,

    /// Config profile (e.g. PROD); overrides STUDY_PROFILE.
    #[arg(long)]
    profile: Option<String>,

    /// Skip difficulty analysis.
    #[arg(long)]
    no_analysis: bool,

    /// Include the full extracted text in the output.
    #[arg(long)]
    with_text: bool,

    /// Pretty-print JSON.
    #[arg(long)]
    pretty: bool,
}

// ── Report ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct FileReport {
    path: PathBuf,
    #[serde(flatten)]
    outcome: ReportOutcome,
}

#[derive(Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum ReportOutcome {
    Normalized {
        content: ExtractedContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<ContentDifficultyAnalysis>,
        #[serde(skip_serializing_if = "Option::is_none")]
        complexity: Option<ComplexityBreakdown>,
    },
    Error {
        class: study_core::ErrorClass,
        reason: String,
        detail: String,
    },
}

fn resolve_path(path: &Path, upload_dir: &Path) -> PathBuf {
    if path.is_relative() && !path.exists() {
        let candidate = upload_dir.join(path);
        if candidate.exists() {
            return candidate;
        }
    }
    path.to_path_buf()
}

// ── Entry point ─────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    config::load_dotenv();
    let config = match &cli.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let registry = ExtractorRegistry::with_asset_dir(&config.ocr, &config.storage.asset_dir);
    info!(
        extensions = registry.supported_extensions().len(),
        "extractor registry ready"
    );
    let store = Arc::new(MemoryContentStore::new());
    let normalizer = ContentNormalizer::new(registry, store);

    let mut failures = 0usize;
    for (offset, file) in cli.files.iter().enumerate() {
        let file_id = cli.first_id + offset as FileId;
        let path = resolve_path(file, &config.storage.upload_dir);
        let upload = UploadRecord::new(file_id, &path);

        let outcome = match normalizer.normalize(&upload).await {
            Ok(mut content) => {
                let analysis = (!cli.no_analysis
                    && content.extraction_status == ExtractionStatus::Succeeded)
                    .then(|| analyze(file_id, &content.raw_text));
                let complexity = analysis
                    .as_ref()
                    .map(|_| study_compute::algorithms::difficulty::complexity(&content.raw_text));
                if content.extraction_status == ExtractionStatus::Failed {
                    failures += 1;
                }
                if !cli.with_text {
                    content.raw_text.clear();
                }
                ReportOutcome::Normalized {
                    content,
                    analysis,
                    complexity,
                }
            }
            Err(e) => {
                failures += 1;
                warn!(file_id, path = %path.display(), error = %e, "normalization failed");
                ReportOutcome::Error {
                    class: e.class(),
                    reason: e.user_message(),
                    detail: e.to_string(),
                }
            }
        };

        let report = FileReport { path, outcome };
        let json = if cli.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        }
        .context("failed to serialize report")?;
        println!("{json}");
    }

    info!(
        files = cli.files.len(),
        failures, "ingest run complete"
    );
    if failures > 0 {
        anyhow::bail!("{failures} of {} file(s) could not be normalized", cli.files.len());
    }
    Ok(())
}
