//! Error types for annotation operations.

use thiserror::Error;

/// Result type for annotation operations.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Errors that can occur while editing or loading annotations.
///
/// None of these are fatal to an editing session: the store is left untouched
/// by any operation that returns one.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// Zoom factor was zero, negative or not finite.
    #[error("Invalid zoom factor: {0}")]
    InvalidZoom(f64),

    /// A commit or merge did not have enough points to form a polygon.
    #[error("Insufficient geometry: need {required}, found {found}")]
    InsufficientGeometry {
        /// Minimum count the operation needs.
        required: usize,
        /// Count actually available.
        found: usize,
    },

    /// An annotation read from an external source had missing or invalid geometry.
    #[error("Malformed annotation: {0}")]
    MalformedAnnotation(String),

    /// Annotation not found on the given page.
    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),

    /// Two annotations on the same page share an id.
    #[error("Duplicate annotation id on page {page}: {id}")]
    DuplicateId {
        /// Page the collision happened on.
        page: u32,
        /// The colliding id.
        id: String,
    },

    /// Page index outside the document.
    #[error("Invalid page: {0}")]
    InvalidPage(u32),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OverlayError {
    /// Whether the error only means "nothing happened" and can be dropped by
    /// an interactive caller.
    #[must_use]
    pub fn is_ignorable(&self) -> bool {
        matches!(
            self,
            Self::InvalidZoom(_) | Self::InsufficientGeometry { .. }
        )
    }
}
