//! # Overlay Export
//!
//! Command-line export of a saved annotation list onto document pages.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p overlay-cli -- annotations.json --output annotated.pdf --pages 3
//! ```
//!
//! ## PNG pages at double resolution:
//!
//! ```bash
//! OVERLAY_EXPORT_SCALE=2 cargo run -p overlay-cli -- annotations.json -o page.png --format png
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ExportJob` - Resolved document, export settings and paths
//! - `run` - Loads annotations, composes pages, writes files

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use overlay_core::AnnotationStore;
use overlay_renderer::{
    BlankDocumentConfig, BlankDocumentRenderer, ExportCompositor, ExportConfig, ExportFormat,
    ExportOutput, Rotation,
};

/// Output formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single PDF document.
    Pdf,
    /// One PNG per page.
    Png,
    /// One JPEG per page.
    Jpeg,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Pdf => Self::Pdf,
            OutputFormat::Png => Self::Png,
            OutputFormat::Jpeg => Self::Jpeg,
        }
    }
}

/// Command-line arguments for overlay-export.
#[derive(Debug, Clone, Parser)]
#[command(name = "overlay-export")]
#[command(about = "Draw saved annotations onto document pages and export them")]
#[command(version)]
pub struct CliArgs {
    /// JSON file holding an array of annotations
    pub input: PathBuf,

    /// Output file; image formats get a page suffix per page
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of pages in the document
    #[arg(long, default_value = "1")]
    pub pages: u32,

    /// Page width in points
    #[arg(long, default_value = "612")]
    pub page_width: f64,

    /// Page height in points
    #[arg(long, default_value = "792")]
    pub page_height: f64,

    /// Output format (overrides the config file)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Render scale (overrides the config file)
    #[arg(long, env = "OVERLAY_EXPORT_SCALE")]
    pub scale: Option<f64>,

    /// Clockwise page rotation in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub rotation: Option<i32>,

    /// Export settings as JSON
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fail if any annotation in the input is malformed
    #[arg(long)]
    pub strict: bool,
}

/// A fully resolved export.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Annotation list to read.
    pub input: PathBuf,
    /// Where to write.
    pub output: PathBuf,
    /// Page source setup.
    pub document: BlankDocumentConfig,
    /// Export settings.
    pub export: ExportConfig,
    /// Reject inputs with malformed entries.
    pub strict: bool,
}

impl ExportJob {
    /// Resolve arguments, reading the config file if one was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or the
    /// rotation is not a multiple of 90 degrees.
    pub fn from_args(args: CliArgs) -> anyhow::Result<Self> {
        let mut export = match &args.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                ExportConfig::from_json(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => ExportConfig::default(),
        };
        if let Some(format) = args.format {
            export.format = format.into();
        }
        if let Some(scale) = args.scale {
            export.scale = scale;
        }
        if let Some(degrees) = args.rotation {
            export.rotation = Rotation::from_degrees(degrees)?;
        }

        Ok(Self {
            input: args.input,
            output: args.output,
            document: BlankDocumentConfig {
                page_count: args.pages,
                page_width: args.page_width,
                page_height: args.page_height,
                ..Default::default()
            },
            export,
            strict: args.strict,
        })
    }
}

/// What an export did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Annotations drawn.
    pub loaded: usize,
    /// Input entries skipped as malformed.
    pub skipped: usize,
    /// Files written.
    pub files: Vec<PathBuf>,
}

/// Run an export job. Nothing is written unless every page exported, and a
/// failed image write removes the pages already written.
///
/// # Errors
///
/// Returns an error if the input cannot be read, a strict job meets a
/// malformed annotation, any page fails to render or a file cannot be written.
pub fn run(job: &ExportJob) -> anyhow::Result<ExportSummary> {
    let json = std::fs::read_to_string(&job.input)
        .with_context(|| format!("reading annotations {}", job.input.display()))?;
    let (store, report) = AnnotationStore::from_json(&json)
        .with_context(|| format!("parsing annotations {}", job.input.display()))?;
    if job.strict && !report.is_clean() {
        anyhow::bail!(
            "{} malformed annotation(s): {}",
            report.skipped.len(),
            report.skipped.join("; ")
        );
    }
    tracing::info!(loaded = report.loaded, skipped = report.skipped.len(), "annotations loaded");

    let renderer = BlankDocumentRenderer::new(job.document.clone())?;
    let output =
        ExportCompositor::new(&renderer, job.export.clone()).export(store.all_annotations())?;

    let files = match output {
        ExportOutput::Pdf(bytes) => {
            write_file(&job.output, &bytes)?;
            vec![job.output.clone()]
        }
        ExportOutput::Images(images) => {
            let mut written = Vec::with_capacity(images.len());
            for image in &images {
                let path = page_path(&job.output, image.page.get(), job.export.format.extension());
                if let Err(e) = write_file(&path, &image.bytes) {
                    remove_files(&written);
                    return Err(e);
                }
                written.push(path);
            }
            written
        }
    };

    Ok(ExportSummary {
        loaded: report.loaded,
        skipped: report.skipped.len(),
        files,
    })
}

/// `out/doc.png` becomes `out/doc-3.png` for page 3.
#[must_use]
pub fn page_path(output: &Path, page: u32, extension: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map_or_else(|| "page".to_string(), |s| s.to_string_lossy().into_owned());
    output.with_file_name(format!("{stem}-{page}.{extension}"))
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "file written");
    Ok(())
}

fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), "could not remove partial export: {e}");
        }
    }
}
