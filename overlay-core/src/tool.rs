//! Drawing tools.

use serde::{Deserialize, Serialize};

use crate::annotation::{Color, StrokeStyle};

/// Which tool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Select and manipulate existing annotations.
    Select,
    /// Pan the page; annotations are inert.
    Hand,
    /// Drag out a line segment.
    Line,
    /// Click vertices, double-click to close.
    Polygon,
}

impl ToolKind {
    /// Whether the tool creates new annotations.
    #[must_use]
    pub const fn is_drawing(self) -> bool {
        matches!(self, Self::Line | Self::Polygon)
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Select => "Select",
            Self::Hand => "Hand",
            Self::Line => "Line",
            Self::Polygon => "Polygon",
        }
    }
}

/// The active tool with the style new annotations inherit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveTool {
    /// Tool kind.
    pub kind: ToolKind,
    /// Stroke color.
    pub color: Color,
    /// Stroke width in canonical units; drawn at `width * zoom` on screen.
    pub stroke_width: f64,
}

impl ActiveTool {
    /// Create a tool.
    #[must_use]
    pub const fn new(kind: ToolKind, color: Color, stroke_width: f64) -> Self {
        Self {
            kind,
            color,
            stroke_width,
        }
    }

    /// The same color and width with a different kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = kind;
        self
    }

    /// Style stamped onto annotations created with this tool.
    #[must_use]
    pub const fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle {
            stroke_color: self.color,
            stroke_width: self.stroke_width,
        }
    }
}

impl Default for ActiveTool {
    fn default() -> Self {
        Self::new(ToolKind::Select, Color::BLUE, 2.0)
    }
}
