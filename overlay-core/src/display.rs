//! Device-space display list handed to the rendering adapter.
//!
//! The list is rebuilt from the store on every page, zoom or annotation
//! change. Committed shapes and construction previews are distinct variants
//! of [`CanvasObject`], so nothing downstream has to inspect flags to tell
//! persisted geometry from scaffolding.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId, Color};
use crate::geometry::DevicePoint;
use crate::normalize::{length_to_device, points_to_device, Zoom};
use crate::transform::Transform;

/// A shape resolved into device space, transform already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeviceShape {
    /// Open segment.
    Line {
        /// First endpoint.
        start: DevicePoint,
        /// Second endpoint.
        end: DevicePoint,
    },
    /// Closed outline.
    Polygon {
        /// Ordered vertices.
        vertices: Vec<DevicePoint>,
    },
}

impl DeviceShape {
    /// Points in drawing order.
    #[must_use]
    pub fn points(&self) -> Vec<DevicePoint> {
        match self {
            Self::Line { start, end } => vec![*start, *end],
            Self::Polygon { vertices } => vertices.clone(),
        }
    }

    /// Whether the outline closes back on its first point.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Polygon { .. })
    }
}

/// Non-persisted scaffolding drawn while a shape is under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "artifact", rename_all = "snake_case")]
pub enum PreviewArtifact {
    /// Dot marking a clicked vertex.
    Marker {
        /// Marker center.
        center: DevicePoint,
        /// Radius in device pixels.
        radius: f64,
        /// Fill color.
        fill: Color,
        /// Outline color.
        outline: Color,
        /// Outline width in device pixels.
        outline_width: f64,
    },
    /// Solid edge between two consecutive clicks.
    Edge {
        /// Previous click.
        from: DevicePoint,
        /// Latest click.
        to: DevicePoint,
        /// Stroke color.
        color: Color,
        /// Stroke width in device pixels.
        width: f64,
    },
    /// Dashed closed outline of the candidate polygon.
    Outline {
        /// Candidate vertices.
        vertices: Vec<DevicePoint>,
        /// Stroke color.
        color: Color,
        /// Stroke width in device pixels.
        width: f64,
        /// Dash pattern in device pixels.
        dash: Vec<f64>,
        /// Opacity in `0.0..=1.0`.
        opacity: f64,
    },
    /// Line being dragged out with the line tool.
    PendingLine {
        /// Press position.
        start: DevicePoint,
        /// Current pointer position.
        end: DevicePoint,
        /// Stroke color.
        color: Color,
        /// Stroke width in device pixels.
        width: f64,
    },
}

/// One drawable entry of the display list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasObject {
    /// Mirror of a stored annotation; selectable.
    Committed {
        /// Store id of the annotation this mirrors.
        id: AnnotationId,
        /// Device geometry.
        shape: DeviceShape,
        /// Stroke color.
        color: Color,
        /// Stroke width in device pixels.
        width: f64,
    },
    /// Construction scaffolding; never selectable, never stored.
    Preview(PreviewArtifact),
}

impl CanvasObject {
    /// Whether the adapter should let the user pick this object.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Store id for committed objects.
    #[must_use]
    pub const fn annotation_id(&self) -> Option<&AnnotationId> {
        match self {
            Self::Committed { id, .. } => Some(id),
            Self::Preview(_) => None,
        }
    }
}

/// Project one annotation into device space at `zoom`.
///
/// The annotation's transform (and an optional parent transform) is applied in
/// canonical space first; the result then crosses the normalizer once.
#[must_use]
pub fn project_annotation(
    annotation: &Annotation,
    zoom: Zoom,
    parent: Option<&Transform>,
) -> CanvasObject {
    let world = annotation.world_points(parent);
    let device = points_to_device(&world, zoom);
    let shape = match (annotation.geometry.kind(), device.as_slice()) {
        (crate::AnnotationKind::Line, [start, end]) => DeviceShape::Line {
            start: *start,
            end: *end,
        },
        _ => DeviceShape::Polygon { vertices: device },
    };
    CanvasObject::Committed {
        id: annotation.id.clone(),
        shape,
        color: annotation.style.stroke_color,
        width: length_to_device(annotation.style.stroke_width, zoom),
    }
}

/// Rebuild the full display list for a page: committed shapes in store
/// order, then previews.
#[must_use]
pub fn build_display_list(
    annotations: &[Annotation],
    zoom: Zoom,
    previews: Vec<PreviewArtifact>,
) -> Vec<CanvasObject> {
    annotations
        .iter()
        .map(|a| project_annotation(a, zoom, None))
        .chain(previews.into_iter().map(CanvasObject::Preview))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{PageIndex, StrokeStyle};
    use crate::geometry::CanonicalPoint;

    #[test]
    fn test_projection_scales_geometry_and_width() {
        let polygon = Annotation::polygon(
            PageIndex::FIRST,
            vec![
                CanonicalPoint::new(10.0, 10.0),
                CanonicalPoint::new(50.0, 10.0),
                CanonicalPoint::new(30.0, 40.0),
            ],
            StrokeStyle::default(),
        )
        .expect("polygon");

        let zoom = Zoom::new(2.0).expect("zoom");
        let object = project_annotation(&polygon, zoom, None);
        let CanvasObject::Committed { shape, width, .. } = object else {
            panic!("expected committed object");
        };
        let expected = [
            DevicePoint::new(20.0, 20.0),
            DevicePoint::new(100.0, 20.0),
            DevicePoint::new(60.0, 80.0),
        ];
        for (got, want) in shape.points().iter().zip(expected.iter()) {
            assert!(got.approx_eq(want, 1e-9));
        }
        assert!((width - 4.0).abs() < 1e-9);
        assert!(shape.is_closed());
    }

    #[test]
    fn test_translate_is_scaled_by_zoom() {
        let line = Annotation::line(
            PageIndex::FIRST,
            CanonicalPoint::new(0.0, 0.0),
            CanonicalPoint::new(10.0, 0.0),
            StrokeStyle::default(),
        )
        .expect("line")
        .with_transform(Transform::translation(5.0, 5.0));

        let zoom = Zoom::new(3.0).expect("zoom");
        let CanvasObject::Committed { shape, .. } = project_annotation(&line, zoom, None) else {
            panic!("expected committed object");
        };
        let DeviceShape::Line { start, end } = shape else {
            panic!("expected line");
        };
        assert!(start.approx_eq(&DevicePoint::new(15.0, 15.0), 1e-9));
        assert!(end.approx_eq(&DevicePoint::new(45.0, 15.0), 1e-9));
    }

    #[test]
    fn test_previews_follow_committed_and_are_inert() {
        let line = Annotation::line(
            PageIndex::FIRST,
            CanonicalPoint::new(0.0, 0.0),
            CanonicalPoint::new(1.0, 1.0),
            StrokeStyle::default(),
        )
        .expect("line");
        let preview = PreviewArtifact::Edge {
            from: DevicePoint::origin(),
            to: DevicePoint::new(1.0, 0.0),
            color: Color::BLUE,
            width: 2.0,
        };

        let list = build_display_list(&[line], Zoom::IDENTITY, vec![preview]);
        assert_eq!(list.len(), 2);
        assert!(list[0].is_interactive());
        assert!(!list[1].is_interactive());
        assert!(list[1].annotation_id().is_none());
    }
}
