//! Committed annotations - the only shapes the store ever holds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::CanonicalPoint;
use crate::transform::{map_points, Transform};
use crate::{OverlayError, OverlayResult};

/// Minimum vertex count of a polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Opaque annotation identifier, unique within a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Create a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an identifier read from an external source.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageIndex(u32);

impl PageIndex {
    /// The first page.
    pub const FIRST: Self = Self(1);

    /// Validate a one-based page number.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidPage`] for page 0.
    pub fn new(page: u32) -> OverlayResult<Self> {
        if page == 0 {
            Err(OverlayError::InvalidPage(page))
        } else {
            Ok(Self(page))
        }
    }

    /// The raw page number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PageIndex {
    type Error = OverlayError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageIndex> for u32 {
    fn from(page: PageIndex) -> Self {
        page.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RGBA stroke color, written as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Default annotation blue.
    pub const BLUE: Self = Self::rgb(0x3b, 0x82, 0xf6);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);

    /// Opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }
}

impl FromStr for Color {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || OverlayError::MalformedAnnotation(format!("invalid color: {s}"));
        let hex = s.strip_prefix('#').ok_or_else(bad)?;
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(bad());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        let a = if hex.len() == 8 { channel(6)? } else { 0xff };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }
}

impl TryFrom<String> for Color {
    type Error = OverlayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// Stroke styling. The width is canonical: divided by zoom at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Stroke color.
    pub stroke_color: Color,
    /// Stroke width in canonical units.
    pub stroke_width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            stroke_color: Color::BLUE,
            stroke_width: 2.0,
        }
    }
}

/// Annotation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Straight segment.
    Line,
    /// Closed polygon.
    Polygon,
}

/// Kind-specific geometry in canonical space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    /// Segment between two points.
    Line {
        /// First endpoint.
        start: CanonicalPoint,
        /// Second endpoint.
        end: CanonicalPoint,
    },
    /// Closed polygon with at least three vertices.
    Polygon {
        /// Ordered vertices.
        vertices: Vec<CanonicalPoint>,
    },
}

impl Geometry {
    /// The variant tag.
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Line { .. } => AnnotationKind::Line,
            Self::Polygon { .. } => AnnotationKind::Polygon,
        }
    }

    /// Local points in order: both endpoints for a line, every vertex for a polygon.
    #[must_use]
    pub fn points(&self) -> Vec<CanonicalPoint> {
        match self {
            Self::Line { start, end } => vec![*start, *end],
            Self::Polygon { vertices } => vertices.clone(),
        }
    }

    /// Check structural validity.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MalformedAnnotation`] for non-finite coordinates
    /// or a polygon with fewer than three vertices.
    pub fn validate(&self) -> OverlayResult<()> {
        if let Self::Polygon { vertices } = self {
            if vertices.len() < MIN_POLYGON_VERTICES {
                return Err(OverlayError::MalformedAnnotation(format!(
                    "polygon has {} vertices, need at least {MIN_POLYGON_VERTICES}",
                    vertices.len()
                )));
            }
        }
        if self.points().iter().any(|p| !p.is_finite()) {
            return Err(OverlayError::MalformedAnnotation(
                "non-finite coordinate".to_string(),
            ));
        }
        Ok(())
    }
}

/// A committed annotation. All geometry is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Identifier, unique within the page.
    pub id: AnnotationId,
    /// Page the annotation belongs to.
    pub page: PageIndex,
    /// Shape in canonical space.
    pub geometry: Geometry,
    /// Stroke styling.
    pub style: StrokeStyle,
    /// Placement on top of the geometry.
    #[serde(default)]
    pub transform: Transform,
}

impl Annotation {
    /// Create a line annotation with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MalformedAnnotation`] if the geometry or style is invalid.
    pub fn line(
        page: PageIndex,
        start: CanonicalPoint,
        end: CanonicalPoint,
        style: StrokeStyle,
    ) -> OverlayResult<Self> {
        Self::from_geometry(page, Geometry::Line { start, end }, style)
    }

    /// Create a polygon annotation with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MalformedAnnotation`] if there are fewer than
    /// three vertices or the style is invalid.
    pub fn polygon(
        page: PageIndex,
        vertices: Vec<CanonicalPoint>,
        style: StrokeStyle,
    ) -> OverlayResult<Self> {
        Self::from_geometry(page, Geometry::Polygon { vertices }, style)
    }

    fn from_geometry(
        page: PageIndex,
        geometry: Geometry,
        style: StrokeStyle,
    ) -> OverlayResult<Self> {
        let annotation = Self {
            id: AnnotationId::new(),
            page,
            geometry,
            style,
            transform: Transform::IDENTITY,
        };
        annotation.validate()?;
        Ok(annotation)
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: AnnotationId) -> Self {
        self.id = id;
        self
    }

    /// The annotation variant.
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        self.geometry.kind()
    }

    /// Check geometry, style and transform.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MalformedAnnotation`] describing the first problem found.
    pub fn validate(&self) -> OverlayResult<()> {
        self.geometry.validate()?;
        if !self.style.stroke_width.is_finite() || self.style.stroke_width < 0.0 {
            return Err(OverlayError::MalformedAnnotation(format!(
                "invalid stroke width {}",
                self.style.stroke_width
            )));
        }
        if !self.transform.is_valid() {
            return Err(OverlayError::MalformedAnnotation(
                "degenerate transform".to_string(),
            ));
        }
        Ok(())
    }

    /// Geometry mapped through the annotation's own transform, then `parent`.
    #[must_use]
    pub fn world_points(&self, parent: Option<&Transform>) -> Vec<CanonicalPoint> {
        let own = self.transform.to_affine();
        let matrix = parent.map_or(own, |p| p.to_affine() * own);
        map_points(matrix, &self.geometry.points())
    }

    /// Parse an annotation from untrusted JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MalformedAnnotation`] if fields are missing or invalid.
    pub fn from_value(value: serde_json::Value) -> OverlayResult<Self> {
        let annotation: Self = serde_json::from_value(value)
            .map_err(|e| OverlayError::MalformedAnnotation(e.to_string()))?;
        annotation.validate()?;
        Ok(annotation)
    }
}
