//! # Overlay Core
//!
//! Annotation geometry engine for paginated documents viewed at variable zoom.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                overlay-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Editor          │  Display List            │
//! │  - Tools         │  - Committed shapes      │
//! │  - Input routing │  - Preview artifacts     │
//! ├─────────────────────────────────────────────┤
//! │  Polygon Session │  Merge Resolver          │
//! │  - Click points  │  - World transforms      │
//! │  - Live preview  │  - Vertex concatenation  │
//! ├─────────────────────────────────────────────┤
//! │  Annotation Store (canonical, per page)     │
//! ├─────────────────────────────────────────────┤
//! │  Normalizer: device ⇄ canonical             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything persisted lives in *canonical* space (zoom = 1.0). Device space
//! only exists at the edges: pointer input and the display list.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod annotation;
pub mod config;
pub mod display;
pub mod editor;
pub mod error;
pub mod event;
pub mod geometry;
pub mod merge;
pub mod normalize;
pub mod selection;
pub mod session;
pub mod store;
pub mod tool;
pub mod transform;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, Color, Geometry, PageIndex, StrokeStyle,
};
pub use config::{EditorConfig, PreviewConfig, ZoomConfig};
pub use display::{CanvasObject, DeviceShape, PreviewArtifact};
pub use editor::AnnotationEditor;
pub use error::{OverlayError, OverlayResult};
pub use event::InputEvent;
pub use geometry::{Canonical, CanonicalPoint, Device, DevicePoint, Point};
pub use merge::MergeResolver;
pub use normalize::Zoom;
pub use selection::SelectionSet;
pub use session::{PolygonSession, SessionState};
pub use store::{AnnotationStore, LoadReport, StoreChange};
pub use tool::{ActiveTool, ToolKind};
pub use transform::Transform;

/// Overlay core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
