//! Click-by-click polygon construction.
//!
//! A [`PolygonSession`] collects device-space clicks for one page. Nothing it
//! holds is persisted: the preview it produces is rebuilt from the collected
//! points on demand, and only [`PolygonSession::commit`] writes to the store.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId, PageIndex, StrokeStyle, MIN_POLYGON_VERTICES};
use crate::config::PreviewConfig;
use crate::display::PreviewArtifact;
use crate::geometry::DevicePoint;
use crate::normalize::{points_to_canonical, points_to_device, Zoom};
use crate::store::AnnotationStore;
use crate::tool::ActiveTool;
use crate::{OverlayError, OverlayResult};

/// Lifecycle of a construction session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "points", rename_all = "snake_case")]
pub enum SessionState {
    /// No clicks yet.
    #[default]
    Idle,
    /// Clicks collected so far, in device space.
    Collecting(Vec<DevicePoint>),
}

/// Polygon under construction on a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonSession {
    page: PageIndex,
    state: SessionState,
}

impl PolygonSession {
    /// Start an idle session on `page`.
    #[must_use]
    pub fn new(page: PageIndex) -> Self {
        Self {
            page,
            state: SessionState::Idle,
        }
    }

    /// Page the session draws on.
    #[must_use]
    pub const fn page(&self) -> PageIndex {
        self.page
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Collected clicks in device space.
    #[must_use]
    pub fn points(&self) -> &[DevicePoint] {
        match &self.state {
            SessionState::Idle => &[],
            SessionState::Collecting(points) => points,
        }
    }

    /// Number of collected clicks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points().len()
    }

    /// Whether no clicks are collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points().is_empty()
    }

    /// Whether enough clicks exist to close a polygon.
    #[must_use]
    pub fn can_commit(&self) -> bool {
        self.len() >= MIN_POLYGON_VERTICES
    }

    /// Record a click. Non-finite points are dropped.
    pub fn add_point(&mut self, point: DevicePoint) {
        if !point.is_finite() {
            tracing::warn!(page = %self.page, %point, "non-finite polygon point dropped");
            return;
        }
        match &mut self.state {
            SessionState::Collecting(points) => points.push(point),
            SessionState::Idle => self.state = SessionState::Collecting(vec![point]),
        }
        tracing::trace!(page = %self.page, count = self.len(), %point, "polygon point added");
    }

    /// Re-express collected clicks after the view zoom changed, so they stay
    /// over the same canonical positions.
    pub fn rescale(&mut self, from: Zoom, to: Zoom) {
        if let SessionState::Collecting(points) = &mut self.state {
            *points = points_to_device(&points_to_canonical(points, from), to);
        }
    }

    /// Build the preview for the current clicks.
    ///
    /// One marker per click, a solid edge between consecutive clicks, and
    /// once three clicks exist a dashed closed outline. Widths and radii are
    /// scaled by `zoom` so they match committed shapes on screen.
    #[must_use]
    pub fn preview(
        &self,
        tool: &ActiveTool,
        zoom: Zoom,
        config: &PreviewConfig,
    ) -> Vec<PreviewArtifact> {
        let points = self.points();
        let scale = zoom.factor();
        let width = tool.stroke_width * scale;
        let mut artifacts = Vec::with_capacity(points.len() * 2 + 1);

        if points.len() >= MIN_POLYGON_VERTICES {
            artifacts.push(PreviewArtifact::Outline {
                vertices: points.to_vec(),
                color: tool.color,
                width,
                dash: config.dash.iter().map(|d| d * scale).collect(),
                opacity: config.opacity,
            });
        }

        artifacts.extend(points.windows(2).map(|pair| PreviewArtifact::Edge {
            from: pair[0],
            to: pair[1],
            color: tool.color,
            width,
        }));

        artifacts.extend(points.iter().map(|&center| PreviewArtifact::Marker {
            center,
            radius: config.marker_radius * scale,
            fill: tool.color,
            outline: config.marker_outline,
            outline_width: config.marker_outline_width * scale,
        }));

        artifacts
    }

    /// Close the polygon and store it.
    ///
    /// Clicks are normalized by `zoom` on the way in. On success the session
    /// returns to [`SessionState::Idle`].
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InsufficientGeometry`] with fewer than three
    /// clicks, leaving the session untouched. Store errors are passed through
    /// and also leave the session untouched.
    pub fn commit(
        &mut self,
        zoom: Zoom,
        style: StrokeStyle,
        store: &mut AnnotationStore,
    ) -> OverlayResult<AnnotationId> {
        if !self.can_commit() {
            return Err(OverlayError::InsufficientGeometry {
                required: MIN_POLYGON_VERTICES,
                found: self.len(),
            });
        }

        let vertices = points_to_canonical(self.points(), zoom);
        let annotation = Annotation::polygon(self.page, vertices, style)?;
        let id = store.add(annotation)?;
        tracing::debug!(page = %self.page, %id, vertices = self.len(), "polygon committed");
        self.state = SessionState::Idle;
        Ok(id)
    }

    /// Drop every collected click.
    pub fn discard(&mut self) {
        if !self.is_empty() {
            tracing::debug!(page = %self.page, count = self.len(), "polygon session discarded");
        }
        self.state = SessionState::Idle;
    }

    /// Status line for the user.
    #[must_use]
    pub fn hint(&self) -> String {
        match self.len() {
            0 => "Click to add points".to_string(),
            n if n < MIN_POLYGON_VERTICES => {
                format!("Points: {n} (need {MIN_POLYGON_VERTICES} minimum)")
            }
            n => format!("Points: {n} | Double-click to complete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CanonicalPoint;

    fn clicks(session: &mut PolygonSession, points: &[(f64, f64)]) {
        for &(x, y) in points {
            session.add_point(DevicePoint::new(x, y));
        }
    }

    #[test]
    fn test_commit_normalizes_by_zoom() {
        let mut store = AnnotationStore::new();
        let mut session = PolygonSession::new(PageIndex::FIRST);
        clicks(&mut session, &[(20.0, 20.0), (100.0, 20.0), (60.0, 80.0)]);

        let zoom = Zoom::new(2.0).expect("zoom");
        let id = session
            .commit(zoom, StrokeStyle::default(), &mut store)
            .expect("commit");

        let stored = store.get(PageIndex::FIRST, &id).expect("stored");
        let expected = [
            CanonicalPoint::new(10.0, 10.0),
            CanonicalPoint::new(50.0, 10.0),
            CanonicalPoint::new(30.0, 40.0),
        ];
        for (got, want) in stored.geometry.points().iter().zip(expected.iter()) {
            assert!(got.approx_eq(want, 1e-9));
        }
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_commit_with_two_points_is_rejected() {
        let mut store = AnnotationStore::new();
        let mut session = PolygonSession::new(PageIndex::FIRST);
        clicks(&mut session, &[(0.0, 0.0), (10.0, 0.0)]);

        let result = session.commit(Zoom::IDENTITY, StrokeStyle::default(), &mut store);
        assert!(matches!(
            result,
            Err(OverlayError::InsufficientGeometry { required: 3, found: 2 })
        ));
        assert_eq!(session.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_preview_contents() {
        let mut session = PolygonSession::new(PageIndex::FIRST);
        let tool = ActiveTool::default();
        let config = PreviewConfig::default();

        clicks(&mut session, &[(0.0, 0.0), (10.0, 0.0)]);
        let preview = session.preview(&tool, Zoom::IDENTITY, &config);
        let edges = preview.iter().filter(|a| matches!(a, PreviewArtifact::Edge { .. })).count();
        let markers = preview
            .iter()
            .filter(|a| matches!(a, PreviewArtifact::Marker { .. }))
            .count();
        assert_eq!((edges, markers), (1, 2));
        assert!(!preview.iter().any(|a| matches!(a, PreviewArtifact::Outline { .. })));

        clicks(&mut session, &[(5.0, 8.0)]);
        let preview = session.preview(&tool, Zoom::IDENTITY, &config);
        assert!(matches!(
            preview[0],
            PreviewArtifact::Outline { ref vertices, .. } if vertices.len() == 3
        ));
    }

    #[test]
    fn test_preview_scales_with_zoom() {
        let mut session = PolygonSession::new(PageIndex::FIRST);
        clicks(&mut session, &[(0.0, 0.0), (10.0, 0.0), (5.0, 8.0)]);
        let zoom = Zoom::new(2.0).expect("zoom");
        let preview = session.preview(&ActiveTool::default(), zoom, &PreviewConfig::default());

        for artifact in &preview {
            match artifact {
                PreviewArtifact::Outline { width, dash, opacity, .. } => {
                    assert!((width - 4.0).abs() < 1e-9);
                    assert_eq!(dash, &vec![10.0, 10.0]);
                    assert!((opacity - 0.7).abs() < 1e-9);
                }
                PreviewArtifact::Edge { width, .. } => assert!((width - 4.0).abs() < 1e-9),
                PreviewArtifact::Marker { radius, outline_width, .. } => {
                    assert!((radius - 6.0).abs() < 1e-9);
                    assert!((outline_width - 4.0).abs() < 1e-9);
                }
                PreviewArtifact::PendingLine { .. } => panic!("unexpected pending line"),
            }
        }
    }

    #[test]
    fn test_rescale_keeps_canonical_position() {
        let mut session = PolygonSession::new(PageIndex::FIRST);
        clicks(&mut session, &[(10.0, 20.0)]);
        session.rescale(Zoom::IDENTITY, Zoom::new(0.5).expect("zoom"));
        assert!(session.points()[0].approx_eq(&DevicePoint::new(5.0, 10.0), 1e-9));
    }

    #[test]
    fn test_discard_and_hints() {
        let mut session = PolygonSession::new(PageIndex::FIRST);
        assert_eq!(session.hint(), "Click to add points");
        clicks(&mut session, &[(0.0, 0.0)]);
        assert_eq!(session.hint(), "Points: 1 (need 3 minimum)");
        clicks(&mut session, &[(1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(session.hint(), "Points: 3 | Double-click to complete");

        session.discard();
        assert!(session.is_empty());
        assert!(session
            .preview(&ActiveTool::default(), Zoom::IDENTITY, &PreviewConfig::default())
            .is_empty());
    }

    #[test]
    fn test_non_finite_point_is_dropped() {
        let mut store = AnnotationStore::new();
        let mut session = PolygonSession::new(PageIndex::FIRST);
        session.add_point(DevicePoint::new(f64::NAN, 4.0));
        session.add_point(DevicePoint::new(1.0, f64::INFINITY));
        assert!(session.is_empty());
        assert_eq!(session.state(), &SessionState::Idle);

        clicks(&mut session, &[(0.0, 0.0), (10.0, 0.0)]);
        session.add_point(DevicePoint::new(f64::NAN, f64::NAN));
        clicks(&mut session, &[(5.0, 8.0)]);
        assert_eq!(session.len(), 3);

        let id = session
            .commit(Zoom::IDENTITY, StrokeStyle::default(), &mut store)
            .expect("commit");
        assert!(store.get(PageIndex::FIRST, &id).is_some());
    }
}
