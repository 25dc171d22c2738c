//! # Overlay Renderer
//!
//! Turns canonical annotations into pixels and documents.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────────┐   ┌─────────────────┐   ┌──────────────┐
//! │ DocumentRenderer │──▶│ raster: stroke  │──▶│ PDF / PNG /  │
//! │ page at scale    │   │ display list    │   │ JPEG encode  │
//! └──────────────────┘   └─────────────────┘   └──────────────┘
//! ```
//!
//! Pages and annotations are always rendered at the same scale, so the
//! overlay lines up with the page regardless of the zoom the user drew at.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod error;
pub mod export;
pub mod raster;

pub use document::{
    BlankDocumentConfig, BlankDocumentRenderer, DocumentRenderer, PageSize, Rotation,
};
pub use error::{RenderError, RenderResult};
pub use export::{ExportCompositor, ExportConfig, ExportFormat, ExportOutput, PageImage};
