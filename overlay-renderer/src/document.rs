//! Document renderers: the page images annotations are drawn over.
//!
//! The overlay never parses documents itself. A [`DocumentRenderer`] reports
//! page count and sizes and rasterizes pages at a zoom; [`BlankDocumentRenderer`]
//! is the built-in implementation that produces empty pages of a fixed size.

use overlay_core::{Color, PageIndex, Zoom};
use serde::{Deserialize, Serialize};
use tiny_skia::{Pixmap, Transform};

use crate::error::{RenderError, RenderResult};

/// Page size in device pixels at some zoom (points at zoom 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl PageSize {
    /// Create a page size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width and height swapped.
    #[must_use]
    pub const fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Whole pixel dimensions, at least 1x1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixels(self) -> (u32, u32) {
        (
            self.width.ceil().max(1.0) as u32,
            self.height.ceil().max(1.0) as u32,
        )
    }
}

/// Clockwise page rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    /// Upright.
    #[default]
    None,
    /// 90 degrees.
    Quarter,
    /// 180 degrees.
    Half,
    /// 270 degrees.
    ThreeQuarter,
}

impl Rotation {
    /// Rotation from degrees. Negative and >= 360 values wrap.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Rotation`] unless `degrees` is a multiple of 90.
    pub fn from_degrees(degrees: i32) -> RenderResult<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::None),
            90 => Ok(Self::Quarter),
            180 => Ok(Self::Half),
            270 => Ok(Self::ThreeQuarter),
            _ => Err(RenderError::Rotation(degrees)),
        }
    }

    /// Degrees clockwise.
    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Quarter => 90,
            Self::Half => 180,
            Self::ThreeQuarter => 270,
        }
    }

    /// The next rotation step clockwise.
    #[must_use]
    pub const fn rotate_cw(self) -> Self {
        match self {
            Self::None => Self::Quarter,
            Self::Quarter => Self::Half,
            Self::Half => Self::ThreeQuarter,
            Self::ThreeQuarter => Self::None,
        }
    }

    /// Whether width and height trade places.
    #[must_use]
    pub const fn is_sideways(self) -> bool {
        matches!(self, Self::Quarter | Self::ThreeQuarter)
    }

    /// Size of an upright page after rotation.
    #[must_use]
    pub const fn apply_to(self, size: PageSize) -> PageSize {
        if self.is_sideways() {
            size.transposed()
        } else {
            size
        }
    }

    /// Maps upright page coordinates onto the rotated surface.
    ///
    /// `size` is the upright page size in the surface's pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn page_transform(self, size: PageSize) -> Transform {
        let (w, h) = (size.width as f32, size.height as f32);
        match self {
            Self::None => Transform::identity(),
            Self::Quarter => Transform::from_row(0.0, 1.0, -1.0, 0.0, h, 0.0),
            Self::Half => Transform::from_row(-1.0, 0.0, 0.0, -1.0, w, h),
            Self::ThreeQuarter => Transform::from_row(0.0, -1.0, 1.0, 0.0, 0.0, w),
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = RenderError;

    fn try_from(degrees: i32) -> RenderResult<Self> {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Source of page images.
pub trait DocumentRenderer {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Upright page size at `zoom`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Page`] if the page does not exist.
    fn page_dimensions(&self, page: PageIndex, zoom: Zoom) -> RenderResult<PageSize>;

    /// Rasterize a page at `zoom`, rotated by `rotation`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Page`] or [`RenderError::Surface`] on failure.
    fn render_page(&self, page: PageIndex, zoom: Zoom, rotation: Rotation) -> RenderResult<Pixmap>;

    /// Every page in order.
    fn pages(&self) -> Vec<PageIndex> {
        (1..=self.page_count())
            .filter_map(|p| PageIndex::new(p).ok())
            .collect()
    }
}

/// Setup for [`BlankDocumentRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankDocumentConfig {
    /// Number of pages.
    pub page_count: u32,
    /// Page width in points.
    pub page_width: f64,
    /// Page height in points.
    pub page_height: f64,
    /// Page fill.
    pub background: Color,
}

impl Default for BlankDocumentConfig {
    /// One US Letter page.
    fn default() -> Self {
        Self {
            page_count: 1,
            page_width: 612.0,
            page_height: 792.0,
            background: Color::WHITE,
        }
    }
}

/// Produces plain pages of one size.
#[derive(Debug, Clone)]
pub struct BlankDocumentRenderer {
    config: BlankDocumentConfig,
}

impl BlankDocumentRenderer {
    /// Create a renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] for zero pages or a non-positive page size.
    pub fn new(config: BlankDocumentConfig) -> RenderResult<Self> {
        if config.page_count == 0 {
            return Err(RenderError::Config("document has no pages".to_string()));
        }
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(config.page_width) || !valid(config.page_height) {
            return Err(RenderError::Config(format!(
                "invalid page size {}x{}",
                config.page_width, config.page_height
            )));
        }
        tracing::debug!(
            pages = config.page_count,
            width = config.page_width,
            height = config.page_height,
            "blank document ready"
        );
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &BlankDocumentConfig {
        &self.config
    }

    fn check_page(&self, page: PageIndex) -> RenderResult<()> {
        if page.get() > self.config.page_count {
            return Err(RenderError::Page {
                page: page.get(),
                reason: format!("document has {} pages", self.config.page_count),
            });
        }
        Ok(())
    }
}

impl DocumentRenderer for BlankDocumentRenderer {
    fn page_count(&self) -> u32 {
        self.config.page_count
    }

    fn page_dimensions(&self, page: PageIndex, zoom: Zoom) -> RenderResult<PageSize> {
        self.check_page(page)?;
        Ok(PageSize::new(
            self.config.page_width * zoom.factor(),
            self.config.page_height * zoom.factor(),
        ))
    }

    fn render_page(&self, page: PageIndex, zoom: Zoom, rotation: Rotation) -> RenderResult<Pixmap> {
        let size = rotation.apply_to(self.page_dimensions(page, zoom)?);
        let (width, height) = size.pixels();
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Surface(format!("cannot allocate {width}x{height} page")))?;
        let bg = self.config.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        tracing::trace!(%page, width, height, rotation = rotation.degrees(), "blank page rendered");
        Ok(pixmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(pages: u32) -> BlankDocumentRenderer {
        BlankDocumentRenderer::new(BlankDocumentConfig {
            page_count: pages,
            page_width: 200.0,
            page_height: 100.0,
            ..Default::default()
        })
        .expect("renderer")
    }

    #[test]
    fn test_rejects_empty_document() {
        let config = BlankDocumentConfig {
            page_count: 0,
            ..Default::default()
        };
        assert!(matches!(BlankDocumentRenderer::new(config), Err(RenderError::Config(_))));
    }

    #[test]
    fn test_dimensions_scale_with_zoom() {
        let zoom = Zoom::new(1.5).expect("zoom");
        let size = renderer(1).page_dimensions(PageIndex::FIRST, zoom).expect("size");
        assert!((size.width - 300.0).abs() < 1e-9);
        assert!((size.height - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_page_out_of_range() {
        let page = PageIndex::new(3).expect("page");
        assert!(matches!(
            renderer(2).render_page(page, Zoom::IDENTITY, Rotation::None),
            Err(RenderError::Page { page: 3, .. })
        ));
    }

    #[test]
    fn test_sideways_render_swaps_size() {
        let pixmap = renderer(1)
            .render_page(PageIndex::FIRST, Zoom::IDENTITY, Rotation::Quarter)
            .expect("page");
        assert_eq!((pixmap.width(), pixmap.height()), (100, 200));
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(-90).expect("rotation"), Rotation::ThreeQuarter);
        assert_eq!(Rotation::from_degrees(450).expect("rotation"), Rotation::Quarter);
        assert!(Rotation::from_degrees(45).is_err());
        assert_eq!(Rotation::ThreeQuarter.rotate_cw(), Rotation::None);
    }

    #[test]
    fn test_page_transform_corners() {
        let size = PageSize::new(200.0, 100.0);
        let mut corner = [tiny_skia::Point::from_xy(0.0, 0.0)];
        Rotation::Quarter.page_transform(size).map_points(&mut corner);
        assert!((corner[0].x - 100.0).abs() < 1e-4 && corner[0].y.abs() < 1e-4);

        let mut corner = [tiny_skia::Point::from_xy(200.0, 100.0)];
        Rotation::Half.page_transform(size).map_points(&mut corner);
        assert!(corner[0].x.abs() < 1e-4 && corner[0].y.abs() < 1e-4);
    }
}
