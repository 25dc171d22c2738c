//! Renderer error types.

use overlay_core::OverlayError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering and export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The document renderer could not be set up.
    #[error("Invalid document configuration: {0}")]
    Config(String),

    /// The document renderer failed to produce a page.
    #[error("Page {page} render failed: {reason}")]
    Page {
        /// 1-based page number.
        page: u32,
        /// What went wrong.
        reason: String,
    },

    /// A raster surface could not be allocated.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Encoding the output failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Rotation other than a multiple of 90 degrees.
    #[error("Unsupported rotation: {0} degrees")]
    Rotation(i32),

    /// Annotation model error.
    #[error(transparent)]
    Core(#[from] OverlayError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
