//! Export of annotated pages to PDF or raster images.
//!
//! The [`ExportCompositor`] renders every page through a [`DocumentRenderer`]
//! at a fixed export scale, strokes that page's annotations on top (projected
//! from canonical space at the same scale) and assembles the result. Export is
//! all-or-nothing: the first failing page aborts with a single error and no
//! output is produced.

use std::collections::BTreeMap;

use image::ImageEncoder;
use overlay_core::display::build_display_list;
use overlay_core::{Annotation, PageIndex, Zoom};
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;

use crate::document::{DocumentRenderer, PageSize, Rotation};
use crate::error::{RenderError, RenderResult};
use crate::raster::draw_objects;

/// Millimetres per PDF point.
const MM_PER_POINT: f64 = 25.4 / 72.0;

/// Resolution the page images are embedded at before fitting.
const PDF_IMAGE_DPI: f64 = 300.0;

/// Export output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One PDF with a page per document page.
    #[default]
    Pdf,
    /// One PNG per page.
    Png,
    /// One JPEG per page.
    Jpeg,
}

impl ExportFormat {
    /// Conventional file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Configuration for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Zoom pages and annotations are rendered at.
    pub scale: f64,
    /// Output format.
    pub format: ExportFormat,
    /// Rotation applied to every page.
    pub rotation: Rotation,
    /// JPEG quality 1-100.
    pub jpeg_quality: u8,
    /// PDF document title.
    pub title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 1.5,
            format: ExportFormat::Pdf,
            rotation: Rotation::None,
            jpeg_quality: 95,
            title: "Annotated Document".to_string(),
        }
    }
}

impl ExportConfig {
    /// Parse a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialization`] on malformed JSON.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One encoded page image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Source page.
    pub page: PageIndex,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

/// Finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutput {
    /// A complete PDF file.
    Pdf(Vec<u8>),
    /// Encoded page images in page order.
    Images(Vec<PageImage>),
}

/// A page rendered with its annotations.
struct ComposedPage {
    page: PageIndex,
    pixmap: Pixmap,
    /// Page size in points, after rotation.
    size_pt: PageSize,
}

/// Composes document pages with annotations and encodes the result.
pub struct ExportCompositor<'a, R: DocumentRenderer> {
    renderer: &'a R,
    config: ExportConfig,
}

impl<'a, R: DocumentRenderer> ExportCompositor<'a, R> {
    /// Create a compositor over `renderer`.
    #[must_use]
    pub fn new(renderer: &'a R, config: ExportConfig) -> Self {
        Self { renderer, config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export every page of the document with `annotations` drawn on top.
    ///
    /// Annotations for pages the document does not have are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first page, surface or encoding failure.
    pub fn export(
        &self,
        annotations: &BTreeMap<PageIndex, Vec<Annotation>>,
    ) -> RenderResult<ExportOutput> {
        let zoom = Zoom::new(self.config.scale)?;
        let page_count = self.renderer.page_count();
        for page in annotations.keys().filter(|p| p.get() > page_count) {
            tracing::warn!(%page, page_count, "annotations on missing page not exported");
        }

        let pages = self
            .renderer
            .pages()
            .into_iter()
            .map(|page| {
                let on_page = annotations.get(&page).map_or(&[][..], Vec::as_slice);
                self.compose_page(page, zoom, on_page)
            })
            .collect::<RenderResult<Vec<_>>>()?;

        let output = match self.config.format {
            ExportFormat::Pdf => ExportOutput::Pdf(self.encode_pdf(&pages)?),
            ExportFormat::Png => ExportOutput::Images(
                pages
                    .iter()
                    .map(|p| -> RenderResult<PageImage> {
                        Ok(PageImage {
                            page: p.page,
                            bytes: encode_png(&p.pixmap)?,
                        })
                    })
                    .collect::<RenderResult<_>>()?,
            ),
            ExportFormat::Jpeg => ExportOutput::Images(
                pages
                    .iter()
                    .map(|p| -> RenderResult<PageImage> {
                        Ok(PageImage {
                            page: p.page,
                            bytes: encode_jpeg(&p.pixmap, self.config.jpeg_quality)?,
                        })
                    })
                    .collect::<RenderResult<_>>()?,
            ),
        };
        tracing::info!(pages = pages.len(), format = ?self.config.format, "export complete");
        Ok(output)
    }

    /// Render one page with its annotations at the export scale.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error for this page.
    pub fn render_page(&self, page: PageIndex, annotations: &[Annotation]) -> RenderResult<Pixmap> {
        let zoom = Zoom::new(self.config.scale)?;
        Ok(self.compose_page(page, zoom, annotations)?.pixmap)
    }

    fn compose_page(
        &self,
        page: PageIndex,
        zoom: Zoom,
        annotations: &[Annotation],
    ) -> RenderResult<ComposedPage> {
        let rotation = self.config.rotation;
        let upright = self.renderer.page_dimensions(page, zoom)?;
        let mut pixmap = self.renderer.render_page(page, zoom, rotation)?;

        let objects = build_display_list(annotations, zoom, Vec::new());
        draw_objects(&mut pixmap, &objects, rotation.page_transform(upright));
        tracing::debug!(%page, annotations = annotations.len(), "page composed");

        let size_pt = rotation.apply_to(self.renderer.page_dimensions(page, Zoom::IDENTITY)?);
        Ok(ComposedPage { page, pixmap, size_pt })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_pdf(&self, pages: &[ComposedPage]) -> RenderResult<Vec<u8>> {
        let Some((first, rest)) = pages.split_first() else {
            return Err(RenderError::Export("document has no pages".to_string()));
        };

        let mm = |pt: f64| printpdf::Mm((pt * MM_PER_POINT) as f32);
        let (doc, page_index, layer_index) = printpdf::PdfDocument::new(
            self.config.title.as_str(),
            mm(first.size_pt.width),
            mm(first.size_pt.height),
            "Page 1",
        );
        place_page_image(doc.get_page(page_index).get_layer(layer_index), first)?;

        for composed in rest {
            let (page_index, layer_index) = doc.add_page(
                mm(composed.size_pt.width),
                mm(composed.size_pt.height),
                format!("Page {}", composed.page),
            );
            place_page_image(doc.get_page(page_index).get_layer(layer_index), composed)?;
        }

        doc.save_to_bytes()
            .map_err(|e| RenderError::Export(format!("PDF save failed: {e}")))
    }
}

/// Embed a page image fitted into the page with its aspect ratio kept, centered.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn place_page_image(
    layer: printpdf::PdfLayerReference,
    composed: &ComposedPage,
) -> RenderResult<()> {
    use printpdf::image_crate::{DynamicImage, RgbImage};

    let (px_w, px_h) = (composed.pixmap.width(), composed.pixmap.height());
    let buffer = RgbImage::from_raw(px_w, px_h, flatten_rgb(&composed.pixmap))
        .ok_or_else(|| RenderError::Export("page image buffer size mismatch".to_string()))?;
    let image = printpdf::Image::from_dynamic_image(&DynamicImage::ImageRgb8(buffer));

    let page_w = composed.size_pt.width * MM_PER_POINT;
    let page_h = composed.size_pt.height * MM_PER_POINT;
    let (fit_w, fit_h) = fit_within(f64::from(px_w), f64::from(px_h), page_w, page_h);
    let natural_w = f64::from(px_w) * 25.4 / PDF_IMAGE_DPI;
    let natural_h = f64::from(px_h) * 25.4 / PDF_IMAGE_DPI;

    image.add_to_layer(
        layer,
        printpdf::ImageTransform {
            translate_x: Some(printpdf::Mm(((page_w - fit_w) / 2.0) as f32)),
            translate_y: Some(printpdf::Mm(((page_h - fit_h) / 2.0) as f32)),
            scale_x: Some((fit_w / natural_w) as f32),
            scale_y: Some((fit_h / natural_h) as f32),
            dpi: Some(PDF_IMAGE_DPI as f32),
            ..Default::default()
        },
    );
    Ok(())
}

/// Largest size with the image's aspect ratio that fits the box.
fn fit_within(image_w: f64, image_h: f64, box_w: f64, box_h: f64) -> (f64, f64) {
    let image_ratio = image_w / image_h;
    if image_ratio > box_w / box_h {
        (box_w, box_w / image_ratio)
    } else {
        (box_h * image_ratio, box_h)
    }
}

/// Drop alpha, compositing over white.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn flatten_rgb(pixmap: &Pixmap) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixmap.data().len() / 4 * 3);
    for pixel in pixmap.data().chunks_exact(4) {
        let uncovered = 255.0 - f32::from(pixel[3]);
        for &channel in &pixel[..3] {
            rgb.push((f32::from(channel) + uncovered).min(255.0) as u8);
        }
    }
    rgb
}

fn encode_png(pixmap: &Pixmap) -> RenderResult<Vec<u8>> {
    pixmap
        .encode_png()
        .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
}

fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> RenderResult<Vec<u8>> {
    let rgb = flatten_rgb(pixmap);
    let mut buf = std::io::Cursor::new(Vec::new());
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .write_image(&rgb, pixmap.width(), pixmap.height(), image::ColorType::Rgb8.into())
        .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlankDocumentConfig, BlankDocumentRenderer};
    use overlay_core::{CanonicalPoint, Color, StrokeStyle};

    fn renderer(pages: u32) -> BlankDocumentRenderer {
        BlankDocumentRenderer::new(BlankDocumentConfig {
            page_count: pages,
            page_width: 100.0,
            page_height: 80.0,
            ..Default::default()
        })
        .expect("renderer")
    }

    fn black_line(y: f64) -> Annotation {
        Annotation::line(
            PageIndex::FIRST,
            CanonicalPoint::new(10.0, y),
            CanonicalPoint::new(90.0, y),
            StrokeStyle {
                stroke_color: Color::BLACK,
                stroke_width: 4.0,
            },
        )
        .expect("line")
    }

    #[test]
    fn test_page_rendered_at_export_scale() {
        let renderer = renderer(1);
        let compositor = ExportCompositor::new(&renderer, ExportConfig::default());
        let pixmap = compositor
            .render_page(PageIndex::FIRST, &[black_line(40.0)])
            .expect("page");

        assert_eq!((pixmap.width(), pixmap.height()), (150, 120));
        let on_line = pixmap.pixel(75, 60).expect("pixel");
        assert_eq!((on_line.red(), on_line.green(), on_line.blue()), (0, 0, 0));
        let off_line = pixmap.pixel(75, 20).expect("pixel");
        assert_eq!(off_line.red(), 255);
    }

    #[test]
    fn test_fit_keeps_aspect_ratio() {
        let (w, h) = fit_within(200.0, 100.0, 100.0, 100.0);
        assert!((w - 100.0).abs() < 1e-9 && (h - 50.0).abs() < 1e-9);
        let (w, h) = fit_within(100.0, 200.0, 100.0, 100.0);
        assert!((w - 50.0).abs() < 1e-9 && (h - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_flatten_over_white() {
        let mut pixmap = Pixmap::new(1, 1).expect("pixmap");
        pixmap.fill(tiny_skia::Color::TRANSPARENT);
        assert_eq!(flatten_rgb(&pixmap), vec![255, 255, 255]);
    }

    #[test]
    fn test_zero_scale_rejected() {
        let renderer = renderer(1);
        let config = ExportConfig {
            scale: 0.0,
            ..Default::default()
        };
        let result = ExportCompositor::new(&renderer, config).export(&BTreeMap::new());
        assert!(matches!(result, Err(RenderError::Core(_))));
    }

    #[test]
    fn test_format_from_json() {
        let json = r#"{ "format": "png", "rotation": 90 }"#;
        let config = ExportConfig::from_json(json).expect("config");
        assert_eq!(config.format, ExportFormat::Png);
        assert_eq!(config.rotation, Rotation::Quarter);
        assert!((config.scale - 1.5).abs() < f64::EPSILON);
    }
}
