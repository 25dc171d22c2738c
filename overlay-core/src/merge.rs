//! Combining several selected shapes into one polygon.

use crate::annotation::{Annotation, AnnotationId, StrokeStyle, MIN_POLYGON_VERTICES};
use crate::geometry::CanonicalPoint;
use crate::selection::SelectionSet;
use crate::store::AnnotationStore;
use crate::transform::Transform;
use crate::{OverlayError, OverlayResult};

/// Merges a selection into a single polygon annotation.
///
/// Each source contributes its vertices after its own transform and the
/// selection's group transform have been applied, so the merged polygon sits
/// exactly where the sources appeared. Vertices are concatenated in selection
/// order; no hull or boolean union is computed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeResolver;

impl MergeResolver {
    /// Fewest shapes a merge accepts.
    pub const MIN_SHAPES: usize = 2;

    /// World-space vertices of `sources`, concatenated in order.
    #[must_use]
    pub fn resolve_vertices(
        sources: &[&Annotation],
        group: Option<&Transform>,
    ) -> Vec<CanonicalPoint> {
        sources
            .iter()
            .flat_map(|annotation| annotation.world_points(group))
            .collect()
    }

    /// Replace the selected annotations with one merged polygon.
    ///
    /// The store is changed in a single step; on any error it is untouched.
    ///
    /// # Errors
    ///
    /// - [`OverlayError::InsufficientGeometry`] with fewer than two selected
    ///   shapes or fewer than three resulting vertices
    /// - [`OverlayError::AnnotationNotFound`] if a selected id is not on the
    ///   selection's page
    pub fn merge(
        store: &mut AnnotationStore,
        selection: &SelectionSet,
        style: StrokeStyle,
    ) -> OverlayResult<AnnotationId> {
        if selection.len() < Self::MIN_SHAPES {
            return Err(OverlayError::InsufficientGeometry {
                required: Self::MIN_SHAPES,
                found: selection.len(),
            });
        }

        let page = selection.page;
        let sources = selection
            .ids()
            .iter()
            .map(|id| {
                store
                    .get(page, id)
                    .ok_or_else(|| OverlayError::AnnotationNotFound(id.to_string()))
            })
            .collect::<OverlayResult<Vec<_>>>()?;

        let vertices = Self::resolve_vertices(&sources, selection.group_transform());
        if vertices.len() < MIN_POLYGON_VERTICES {
            return Err(OverlayError::InsufficientGeometry {
                required: MIN_POLYGON_VERTICES,
                found: vertices.len(),
            });
        }

        let merged = Annotation::polygon(page, vertices, style)?;
        let id = store.replace(page, selection.ids(), merged)?;
        tracing::info!(%page, sources = selection.len(), %id, "shapes merged");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Geometry, PageIndex};

    fn pt(x: f64, y: f64) -> CanonicalPoint {
        CanonicalPoint::new(x, y)
    }

    fn segment(start: CanonicalPoint, end: CanonicalPoint) -> Annotation {
        Annotation::line(PageIndex::FIRST, start, end, StrokeStyle::default()).expect("line")
    }

    fn seeded() -> (AnnotationStore, AnnotationId, AnnotationId, AnnotationId) {
        let mut store = AnnotationStore::new();
        let line = store.add(segment(pt(0.0, 0.0), pt(10.0, 0.0))).expect("add line");
        let square = store
            .add(
                Annotation::polygon(
                    PageIndex::FIRST,
                    vec![pt(20.0, 20.0), pt(30.0, 20.0), pt(30.0, 30.0), pt(20.0, 30.0)],
                    StrokeStyle::default(),
                )
                .expect("square"),
            )
            .expect("add square");
        let other = store.add(segment(pt(5.0, 5.0), pt(6.0, 6.0))).expect("add other");
        (store, line, square, other)
    }

    #[test]
    fn test_merge_concatenates_in_selection_order() {
        let (mut store, line, square, other) = seeded();
        let selection = SelectionSet::new(PageIndex::FIRST, [line.clone(), square.clone()]);

        let id =
            MergeResolver::merge(&mut store, &selection, StrokeStyle::default()).expect("merge");

        let merged = store.get(PageIndex::FIRST, &id).expect("merged");
        let Geometry::Polygon { vertices } = &merged.geometry else {
            panic!("expected polygon");
        };
        let expected = [
            pt(0.0, 0.0),
            pt(10.0, 0.0),
            pt(20.0, 20.0),
            pt(30.0, 20.0),
            pt(30.0, 30.0),
            pt(20.0, 30.0),
        ];
        assert_eq!(vertices.len(), expected.len());
        for (got, want) in vertices.iter().zip(expected.iter()) {
            assert!(got.approx_eq(want, 1e-9));
        }

        assert!(store.get(PageIndex::FIRST, &line).is_none());
        assert!(store.get(PageIndex::FIRST, &square).is_none());
        assert!(store.get(PageIndex::FIRST, &other).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_single_shape_is_rejected() {
        let (mut store, line, ..) = seeded();
        let selection = SelectionSet::new(PageIndex::FIRST, [line]);
        let result = MergeResolver::merge(&mut store, &selection, StrokeStyle::default());
        assert!(matches!(
            result,
            Err(OverlayError::InsufficientGeometry { required: 2, found: 1 })
        ));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_unknown_id_leaves_store_untouched() {
        let (mut store, line, ..) = seeded();
        let selection =
            SelectionSet::new(PageIndex::FIRST, [line, AnnotationId::from_string("missing")]);
        let result = MergeResolver::merge(&mut store, &selection, StrokeStyle::default());
        assert!(matches!(result, Err(OverlayError::AnnotationNotFound(_))));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_transforms_are_baked_in() {
        let mut store = AnnotationStore::new();
        let moved = store
            .add(
                segment(pt(0.0, 0.0), pt(10.0, 0.0))
                    .with_transform(Transform::translation(100.0, 0.0).with_rotation(90.0)),
            )
            .expect("add");
        let plain = store.add(segment(pt(0.0, 0.0), pt(0.0, 10.0))).expect("add");

        let selection = SelectionSet::new(PageIndex::FIRST, [moved, plain])
            .with_group(Transform::translation(0.0, 5.0));
        let id =
            MergeResolver::merge(&mut store, &selection, StrokeStyle::default()).expect("merge");

        let merged = store.get(PageIndex::FIRST, &id).expect("merged");
        assert!(merged.transform.is_identity());
        let points = merged.geometry.points();
        let expected = [pt(100.0, 5.0), pt(100.0, 15.0), pt(0.0, 5.0), pt(0.0, 15.0)];
        for (got, want) in points.iter().zip(expected.iter()) {
            assert!(got.approx_eq(want, 1e-9), "{got} != {want}");
        }
    }

    #[test]
    fn test_two_short_lines_still_merge() {
        let mut store = AnnotationStore::new();
        let a = store.add(segment(pt(0.0, 0.0), pt(1.0, 0.0))).expect("add");
        let b = store.add(segment(pt(1.0, 1.0), pt(0.0, 1.0))).expect("add");
        let selection = SelectionSet::new(PageIndex::FIRST, [a, b]);
        let id =
            MergeResolver::merge(&mut store, &selection, StrokeStyle::default()).expect("merge");
        let merged = store.get(PageIndex::FIRST, &id).expect("merged");
        assert_eq!(merged.geometry.points().len(), 4);
    }
}
