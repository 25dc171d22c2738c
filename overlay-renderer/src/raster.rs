//! Stroking display-list objects onto a raster surface.

use overlay_core::{CanvasObject, Color, DevicePoint, DeviceShape, PreviewArtifact};
use tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, StrokeDash, Transform,
};

/// Draw every object in order. `transform` maps device coordinates onto the
/// surface, e.g. a page rotation.
///
/// Objects whose geometry cannot form a path (empty or non-finite) are skipped.
pub fn draw_objects(pixmap: &mut Pixmap, objects: &[CanvasObject], transform: Transform) {
    for object in objects {
        match object {
            CanvasObject::Committed {
                id,
                shape,
                color,
                width,
            } => {
                tracing::trace!(%id, "drawing annotation");
                let path = match shape {
                    DeviceShape::Line { start, end } => polyline(&[*start, *end], false),
                    DeviceShape::Polygon { vertices } => polyline(vertices, true),
                };
                if let Some(path) = path {
                    stroke(pixmap, &path, *color, 1.0, *width, None, transform);
                }
            }
            CanvasObject::Preview(artifact) => draw_preview(pixmap, artifact, transform),
        }
    }
}

fn draw_preview(pixmap: &mut Pixmap, artifact: &PreviewArtifact, transform: Transform) {
    match artifact {
        PreviewArtifact::Marker {
            center,
            radius,
            fill,
            outline,
            outline_width,
        } => {
            #[allow(clippy::cast_possible_truncation)]
            let (cx, cy, r) = (center.x as f32, center.y as f32, *radius as f32);
            let Some(circle) = PathBuilder::from_circle(cx, cy, r) else {
                return;
            };
            let mut paint = Paint::default();
            paint.set_color_rgba8(fill.r, fill.g, fill.b, fill.a);
            paint.anti_alias = true;
            pixmap.fill_path(&circle, &paint, FillRule::Winding, transform, None);
            stroke(pixmap, &circle, *outline, 1.0, *outline_width, None, transform);
        }
        PreviewArtifact::Edge {
            from,
            to,
            color,
            width,
        }
        | PreviewArtifact::PendingLine {
            start: from,
            end: to,
            color,
            width,
        } => {
            if let Some(path) = polyline(&[*from, *to], false) {
                stroke(pixmap, &path, *color, 1.0, *width, None, transform);
            }
        }
        PreviewArtifact::Outline {
            vertices,
            color,
            width,
            dash,
            opacity,
        } => {
            if let Some(path) = polyline(vertices, true) {
                stroke(pixmap, &path, *color, *opacity, *width, Some(dash), transform);
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn polyline(points: &[DevicePoint], closed: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(first.x as f32, first.y as f32);
    for p in rest {
        builder.line_to(p.x as f32, p.y as f32);
    }
    if closed {
        builder.close();
    }
    builder.finish()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::too_many_arguments)]
fn stroke(
    pixmap: &mut Pixmap,
    path: &Path,
    color: Color,
    opacity: f64,
    width: f64,
    dash: Option<&[f64]>,
    transform: Transform,
) {
    if width <= 0.0 {
        return;
    }
    let mut paint = Paint::default();
    let alpha = (f64::from(color.a) * opacity.clamp(0.0, 1.0)).round() as u8;
    paint.set_color_rgba8(color.r, color.g, color.b, alpha);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        dash: dash.and_then(|d| StrokeDash::new(d.iter().map(|v| *v as f32).collect(), 0.0)),
        ..Stroke::default()
    };
    pixmap.stroke_path(path, &paint, &stroke, transform, None);
}
