//! # Overlay Export
//!
//! Draws saved annotations onto document pages and writes PDF or images.

use clap::Parser;
use overlay_cli::{run, CliArgs, ExportJob};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing subscriber with optional JSON output.
///
/// Set `RUST_LOG_FORMAT=json` for machine-readable logs.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,overlay_core=debug,overlay_renderer=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let job = ExportJob::from_args(args)?;
    tracing::info!(
        input = %job.input.display(),
        pages = job.document.page_count,
        scale = job.export.scale,
        format = ?job.export.format,
        "starting export"
    );

    let summary = run(&job)?;
    if summary.skipped > 0 {
        tracing::warn!(
            skipped = summary.skipped,
            "some annotations were malformed and not exported"
        );
    }
    for file in &summary.files {
        tracing::info!(path = %file.display(), "wrote");
    }
    Ok(())
}
