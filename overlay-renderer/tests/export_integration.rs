//! Integration tests for annotated page export (overlay-renderer).
//!
//! Covers multi-page documents, each output format, rotation and failure
//! handling.

use std::collections::BTreeMap;

use overlay_core::{
    Annotation, AnnotationStore, CanonicalPoint, Color, PageIndex, StrokeStyle, Zoom,
};
use overlay_renderer::{
    BlankDocumentConfig, BlankDocumentRenderer, DocumentRenderer, ExportCompositor, ExportConfig,
    ExportFormat, ExportOutput, PageSize, RenderError, RenderResult, Rotation,
};
use tiny_skia::Pixmap;

/// Blank document of `pages` 200x100pt pages.
fn document(pages: u32) -> BlankDocumentRenderer {
    BlankDocumentRenderer::new(BlankDocumentConfig {
        page_count: pages,
        page_width: 200.0,
        page_height: 100.0,
        ..Default::default()
    })
    .expect("renderer")
}

fn red() -> StrokeStyle {
    StrokeStyle {
        stroke_color: Color::rgb(255, 0, 0),
        stroke_width: 4.0,
    }
}

fn triangle(page: u32) -> Annotation {
    Annotation::polygon(
        PageIndex::new(page).expect("page"),
        vec![
            CanonicalPoint::new(10.0, 10.0),
            CanonicalPoint::new(50.0, 10.0),
            CanonicalPoint::new(30.0, 40.0),
        ],
        red(),
    )
    .expect("polygon")
}

fn store_with(annotations: Vec<Annotation>) -> AnnotationStore {
    let mut store = AnnotationStore::new();
    for annotation in annotations {
        store.add(annotation).expect("add");
    }
    store
}

fn config(format: ExportFormat) -> ExportConfig {
    ExportConfig {
        format,
        ..Default::default()
    }
}

/// Renderer whose second page always fails.
struct FlakyDocument(BlankDocumentRenderer);

impl DocumentRenderer for FlakyDocument {
    fn page_count(&self) -> u32 {
        self.0.page_count()
    }

    fn page_dimensions(&self, page: PageIndex, zoom: Zoom) -> RenderResult<PageSize> {
        self.0.page_dimensions(page, zoom)
    }

    fn render_page(&self, page: PageIndex, zoom: Zoom, rotation: Rotation) -> RenderResult<Pixmap> {
        if page.get() == 2 {
            return Err(RenderError::Page {
                page: 2,
                reason: "corrupt page stream".to_string(),
            });
        }
        self.0.render_page(page, zoom, rotation)
    }
}

// ==========================================================================
// Format tests
// ==========================================================================

#[test]
fn test_pdf_export_produces_pdf_bytes() {
    let renderer = document(2);
    let store = store_with(vec![triangle(1), triangle(2)]);
    let output = ExportCompositor::new(&renderer, config(ExportFormat::Pdf))
        .export(store.all_annotations())
        .expect("export");

    let ExportOutput::Pdf(bytes) = output else {
        panic!("expected PDF output");
    };
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn test_png_export_one_image_per_page() {
    let renderer = document(3);
    let store = store_with(vec![triangle(2)]);
    let output = ExportCompositor::new(&renderer, config(ExportFormat::Png))
        .export(store.all_annotations())
        .expect("export");

    let ExportOutput::Images(images) = output else {
        panic!("expected images");
    };
    let pages: Vec<u32> = images.iter().map(|i| i.page.get()).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    for image in &images {
        assert_eq!(&image.bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    let decoded = image::load_from_memory(&images[1].bytes).expect("decode").to_rgb8();
    assert_eq!(decoded.dimensions(), (300, 150));
    // First edge runs along canonical y = 10, i.e. y = 15 at export scale.
    assert_eq!(decoded.get_pixel(45, 15).0, [255, 0, 0]);
}

#[test]
fn test_jpeg_export_encodes_each_page() {
    let renderer = document(2);
    let output = ExportCompositor::new(&renderer, config(ExportFormat::Jpeg))
        .export(&BTreeMap::new())
        .expect("export");

    let ExportOutput::Images(images) = output else {
        panic!("expected images");
    };
    assert_eq!(images.len(), 2);
    assert!(images.iter().all(|i| i.bytes.starts_with(&[0xFF, 0xD8])));
}

// ==========================================================================
// Geometry tests
// ==========================================================================

#[test]
fn test_annotations_follow_page_rotation() {
    let renderer = document(1);
    let config = ExportConfig {
        format: ExportFormat::Png,
        rotation: Rotation::Quarter,
        scale: 1.0,
        ..Default::default()
    };
    let line = Annotation::line(
        PageIndex::FIRST,
        CanonicalPoint::new(20.0, 10.0),
        CanonicalPoint::new(180.0, 10.0),
        red(),
    )
    .expect("line");

    let pixmap = ExportCompositor::new(&renderer, config)
        .render_page(PageIndex::FIRST, &[line])
        .expect("page");
    assert_eq!((pixmap.width(), pixmap.height()), (100, 200));

    // Upright (100, 10) lands at (100 - 10, 100) after a clockwise quarter turn.
    let rotated = pixmap.pixel(90, 100).expect("pixel");
    assert_eq!((rotated.red(), rotated.green(), rotated.blue()), (255, 0, 0));
}

#[test]
fn test_annotations_on_missing_pages_are_ignored() {
    let renderer = document(1);
    let mut annotations = BTreeMap::new();
    annotations.insert(PageIndex::new(5).expect("page"), vec![triangle(5)]);

    let output = ExportCompositor::new(&renderer, config(ExportFormat::Png))
        .export(&annotations)
        .expect("export");
    let ExportOutput::Images(images) = output else {
        panic!("expected images");
    };
    assert_eq!(images.len(), 1);
}

// ==========================================================================
// Failure tests
// ==========================================================================

#[test]
fn test_page_failure_aborts_whole_export() {
    let renderer = FlakyDocument(document(3));
    let compositor = ExportCompositor::new(&renderer, config(ExportFormat::Pdf));
    let result = compositor.export(&BTreeMap::new());
    assert!(matches!(result, Err(RenderError::Page { page: 2, .. })));
}
