//! Editor configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "zoom": { "max": 4.0 }, "default_color": "#ef4444" }
//! ```

use serde::{Deserialize, Serialize};

use crate::annotation::Color;
use crate::normalize::Zoom;
use crate::tool::{ActiveTool, ToolKind};
use crate::{OverlayError, OverlayResult};

/// Zoom stepping and limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Smallest allowed zoom.
    pub min: f64,
    /// Largest allowed zoom.
    pub max: f64,
    /// Increment for zoom in/out.
    pub step: f64,
    /// Zoom on startup.
    pub initial: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.25,
            max: 3.0,
            step: 0.25,
            initial: 1.0,
        }
    }
}

impl ZoomConfig {
    /// Clamp a raw factor into range and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidZoom`] if the clamped value is not positive.
    pub fn clamp(&self, factor: f64) -> OverlayResult<Zoom> {
        Zoom::new(factor.max(self.min).min(self.max))
    }
}

/// Styling of polygon-construction preview artifacts, in device pixels
/// before zoom is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Dash pattern of the preview outline.
    pub dash: Vec<f64>,
    /// Opacity of the preview outline.
    pub opacity: f64,
    /// Radius of click markers.
    pub marker_radius: f64,
    /// Outline width of click markers.
    pub marker_outline_width: f64,
    /// Outline color of click markers.
    pub marker_outline: Color,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            dash: vec![5.0, 5.0],
            opacity: 0.7,
            marker_radius: 3.0,
            marker_outline_width: 2.0,
            marker_outline: Color::WHITE,
        }
    }
}

/// Top-level editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Zoom limits.
    pub zoom: ZoomConfig,
    /// Preview styling.
    pub preview: PreviewConfig,
    /// Color new tools start with.
    pub default_color: Color,
    /// Canonical stroke width new tools start with.
    pub default_stroke_width: f64,
    /// Lines shorter than this many device pixels are dropped on release.
    pub min_line_length: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomConfig::default(),
            preview: PreviewConfig::default(),
            default_color: Color::BLUE,
            default_stroke_width: 2.0,
            min_line_length: 1.0,
        }
    }
}

impl EditorConfig {
    /// Parse a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Serialization`] on malformed JSON and
    /// [`OverlayError::InvalidZoom`] if the zoom range is unusable.
    pub fn from_json(json: &str) -> OverlayResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the zoom range is usable.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidZoom`] naming the offending bound.
    pub fn validate(&self) -> OverlayResult<()> {
        let zoom = &self.zoom;
        Zoom::new(zoom.min)?;
        Zoom::new(zoom.step)?;
        if zoom.max < zoom.min {
            return Err(OverlayError::InvalidZoom(zoom.max));
        }
        if zoom.initial < zoom.min || zoom.initial > zoom.max {
            return Err(OverlayError::InvalidZoom(zoom.initial));
        }
        Ok(())
    }

    /// The tool selected on startup.
    #[must_use]
    pub fn initial_tool(&self) -> ActiveTool {
        ActiveTool::new(ToolKind::Select, self.default_color, self.default_stroke_width)
    }
}
