//! The editing façade.
//!
//! [`AnnotationEditor`] owns the store and the transient editing state for
//! one document: the active tool, the current page and zoom, the polygon
//! session, an in-progress line and the selection. Input arrives as
//! [`InputEvent`]s in device space; anything persisted is normalized first.
//!
//! Editing never hard-fails. Input that cannot produce a shape (a polygon
//! closed with two clicks, a click-only line) is dropped and the editor stays
//! usable.

use std::collections::BTreeMap;

use crate::annotation::{Annotation, AnnotationId, PageIndex, StrokeStyle};
use crate::config::EditorConfig;
use crate::display::{build_display_list, CanvasObject, PreviewArtifact};
use crate::event::InputEvent;
use crate::geometry::DevicePoint;
use crate::merge::MergeResolver;
use crate::normalize::{length_to_device, to_canonical, to_device, Zoom};
use crate::selection::SelectionSet;
use crate::session::PolygonSession;
use crate::store::{AnnotationStore, StoreChange};
use crate::tool::{ActiveTool, ToolKind};
use crate::transform::Transform;
use crate::{OverlayError, OverlayResult};

/// Line being dragged out with the line tool, in device space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingLine {
    start: DevicePoint,
    end: DevicePoint,
}

/// Editing state for one paginated document.
#[derive(Debug)]
pub struct AnnotationEditor {
    config: EditorConfig,
    store: AnnotationStore,
    tool: ActiveTool,
    page: PageIndex,
    page_count: u32,
    zoom: Zoom,
    session: PolygonSession,
    pending_line: Option<PendingLine>,
    selection: SelectionSet,
}

impl AnnotationEditor {
    /// Create an editor for a document with `page_count` pages, opened on page 1.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidPage`] for an empty document and
    /// [`OverlayError::InvalidZoom`] if the config's zoom range is unusable.
    pub fn new(config: EditorConfig, page_count: u32) -> OverlayResult<Self> {
        config.validate()?;
        if page_count == 0 {
            return Err(OverlayError::InvalidPage(0));
        }
        let zoom = Zoom::new(config.zoom.initial)?;
        let tool = config.initial_tool();
        tracing::debug!(page_count, zoom = zoom.factor(), "editor created");
        Ok(Self {
            config,
            store: AnnotationStore::new(),
            tool,
            page: PageIndex::FIRST,
            page_count,
            zoom,
            session: PolygonSession::new(PageIndex::FIRST),
            pending_line: None,
            selection: SelectionSet::empty(PageIndex::FIRST),
        })
    }

    /// Replace the store, e.g. after loading annotations from disk.
    ///
    /// Listeners registered through [`AnnotationEditor::subscribe`] move to the
    /// new store and run after any the store already had. Pages beyond
    /// `page_count` are kept but logged, since the editor cannot navigate to them.
    #[must_use]
    pub fn with_store(mut self, mut store: AnnotationStore) -> Self {
        for page in store.pages().filter(|p| p.get() > self.page_count) {
            tracing::warn!(%page, page_count = self.page_count, "store page outside document");
        }
        store.adopt_listeners(&mut self.store);
        self.store = store;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Editor configuration.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The annotation store.
    #[must_use]
    pub const fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// The active tool.
    #[must_use]
    pub const fn tool(&self) -> &ActiveTool {
        &self.tool
    }

    /// The page being edited.
    #[must_use]
    pub const fn page(&self) -> PageIndex {
        self.page
    }

    /// Number of pages in the document.
    #[must_use]
    pub const fn page_count(&self) -> u32 {
        self.page_count
    }

    /// The current view zoom.
    #[must_use]
    pub const fn zoom(&self) -> Zoom {
        self.zoom
    }

    /// The polygon session on the current page.
    #[must_use]
    pub const fn session(&self) -> &PolygonSession {
        &self.session
    }

    /// The current selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Annotations on the current page, canonical.
    #[must_use]
    pub fn current_annotations(&self) -> &[Annotation] {
        self.store.by_page(self.page)
    }

    /// Every annotation, grouped by page.
    #[must_use]
    pub fn all_annotations(&self) -> &BTreeMap<PageIndex, Vec<Annotation>> {
        self.store.all_annotations()
    }

    /// Annotation count across all pages.
    #[must_use]
    pub fn annotation_count(&self) -> usize {
        self.store.len()
    }

    /// Register a store change listener.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        self.store.subscribe(listener);
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Route one input event to the active tool.
    ///
    /// Returns the id of the annotation the event committed, if any.
    pub fn handle(&mut self, event: InputEvent) -> Option<AnnotationId> {
        if matches!(event, InputEvent::Cancel) {
            self.discard_drawing();
            return None;
        }

        match (self.tool.kind, event) {
            (ToolKind::Polygon, InputEvent::PointerDown(p)) => {
                self.session.add_point(p);
                None
            }
            (ToolKind::Polygon, InputEvent::DoubleClick(_)) => {
                let result = self.commit_polygon();
                self.swallow(result)
            }
            (ToolKind::Line, InputEvent::PointerDown(p)) => {
                self.pending_line = Some(PendingLine { start: p, end: p });
                None
            }
            (ToolKind::Line, InputEvent::PointerMove(p)) => {
                if let Some(line) = &mut self.pending_line {
                    line.end = p;
                }
                None
            }
            (ToolKind::Line, InputEvent::PointerUp(p)) => {
                let result = self.commit_line(p);
                self.swallow(result)
            }
            _ => None,
        }
    }

    /// Close the polygon under construction.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InsufficientGeometry`] with fewer than three
    /// clicks; nothing changes in that case.
    pub fn commit_polygon(&mut self) -> OverlayResult<AnnotationId> {
        self.session
            .commit(self.zoom, self.tool.stroke_style(), &mut self.store)
    }

    fn commit_line(&mut self, release: DevicePoint) -> OverlayResult<Option<AnnotationId>> {
        let Some(mut line) = self.pending_line.take() else {
            return Ok(None);
        };
        line.end = release;
        if line.start.distance_to(&line.end) < self.config.min_line_length {
            tracing::debug!(page = %self.page, "line too short, dropped");
            return Ok(None);
        }

        let annotation = Annotation::line(
            self.page,
            to_canonical(line.start, self.zoom),
            to_canonical(line.end, self.zoom),
            self.tool.stroke_style(),
        )?;
        let id = self.store.add(annotation)?;
        tracing::debug!(page = %self.page, %id, "line committed");
        Ok(Some(id))
    }

    fn swallow<T>(&self, result: OverlayResult<T>) -> Option<AnnotationId>
    where
        T: Into<Option<AnnotationId>>,
    {
        match result {
            Ok(id) => id.into(),
            Err(e) if e.is_ignorable() => {
                tracing::debug!(page = %self.page, "input ignored: {e}");
                None
            }
            Err(e) => {
                tracing::warn!(page = %self.page, "input rejected: {e}");
                None
            }
        }
    }

    fn discard_drawing(&mut self) {
        self.session.discard();
        self.pending_line = None;
    }

    // ------------------------------------------------------------------
    // Tools
    // ------------------------------------------------------------------

    /// Switch tools. Switching to a different tool discards any drawing in
    /// progress, and leaving the select tool clears the selection.
    pub fn set_tool(&mut self, kind: ToolKind) {
        if kind == self.tool.kind {
            return;
        }
        if self.tool.kind == ToolKind::Select {
            self.selection.clear();
        }
        self.discard_drawing();
        tracing::debug!(from = self.tool.kind.label(), to = kind.label(), "tool changed");
        self.tool = self.tool.with_kind(kind);
    }

    /// Set the color and canonical stroke width of new shapes.
    ///
    /// A non-finite or negative width is ignored.
    pub fn set_tool_style(&mut self, style: StrokeStyle) {
        self.tool.color = style.stroke_color;
        if style.stroke_width.is_finite() && style.stroke_width >= 0.0 {
            self.tool.stroke_width = style.stroke_width;
        } else {
            tracing::warn!(width = style.stroke_width, "invalid stroke width ignored");
        }
    }

    /// Status text for the polygon tool, `None` for other tools.
    #[must_use]
    pub fn session_hint(&self) -> Option<String> {
        (self.tool.kind == ToolKind::Polygon).then(|| self.session.hint())
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Go to `page`.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidPage`] outside `1..=page_count`.
    pub fn set_page(&mut self, page: u32) -> OverlayResult<()> {
        if page > self.page_count {
            return Err(OverlayError::InvalidPage(page));
        }
        let page = PageIndex::new(page)?;
        if page == self.page {
            return Ok(());
        }
        self.discard_drawing();
        self.page = page;
        self.session = PolygonSession::new(page);
        self.selection = SelectionSet::empty(page);
        tracing::debug!(%page, "page changed");
        Ok(())
    }

    /// Go to the next page if there is one. Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        let next = self.page.get().saturating_add(1);
        next <= self.page_count && self.set_page(next).is_ok()
    }

    /// Go to the previous page if there is one. Returns whether the page changed.
    pub fn prev_page(&mut self) -> bool {
        let prev = self.page.get() - 1;
        prev >= 1 && self.set_page(prev).is_ok()
    }

    /// Set the view zoom, clamped into the configured range.
    ///
    /// Clicks collected by an open polygon session are re-expressed at the new
    /// zoom so they stay over the same spot on the page.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidZoom`] for a zero, negative or
    /// non-finite factor; the old zoom stays active.
    pub fn set_zoom(&mut self, factor: f64) -> OverlayResult<Zoom> {
        if let Err(e) = Zoom::new(factor) {
            tracing::warn!(factor, "zoom rejected");
            return Err(e);
        }
        let zoom = self.config.zoom.clamp(factor)?;
        self.apply_zoom(zoom);
        Ok(zoom)
    }

    /// Zoom in by one step, stopping at the configured maximum.
    pub fn zoom_in(&mut self) -> Zoom {
        self.step_zoom(self.config.zoom.step)
    }

    /// Zoom out by one step, stopping at the configured minimum.
    pub fn zoom_out(&mut self) -> Zoom {
        self.step_zoom(-self.config.zoom.step)
    }

    // A step below zero lands on the minimum instead of being rejected.
    fn step_zoom(&mut self, delta: f64) -> Zoom {
        if let Ok(zoom) = self.config.zoom.clamp(self.zoom.factor() + delta) {
            self.apply_zoom(zoom);
        }
        self.zoom
    }

    fn apply_zoom(&mut self, zoom: Zoom) {
        if zoom == self.zoom {
            return;
        }
        self.session.rescale(self.zoom, zoom);
        if let Some(line) = &mut self.pending_line {
            line.start = to_device(to_canonical(line.start, self.zoom), zoom);
            line.end = to_device(to_canonical(line.end, self.zoom), zoom);
        }
        tracing::debug!(from = self.zoom.factor(), to = zoom.factor(), "zoom changed");
        self.zoom = zoom;
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Accept a selection reported by the rendering adapter.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidPage`] if the selection is for another
    /// page and [`OverlayError::AnnotationNotFound`] for an unknown id.
    pub fn set_selection(&mut self, selection: SelectionSet) -> OverlayResult<()> {
        if selection.page != self.page {
            return Err(OverlayError::InvalidPage(selection.page.get()));
        }
        if let Some(missing) = selection
            .ids()
            .iter()
            .find(|id| self.store.get(self.page, id).is_none())
        {
            return Err(OverlayError::AnnotationNotFound(missing.to_string()));
        }
        self.selection = selection;
        Ok(())
    }

    /// Drop the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Whether the current selection can be merged.
    #[must_use]
    pub fn can_merge(&self) -> bool {
        self.selection.len() >= MergeResolver::MIN_SHAPES
    }

    /// Merge the selected shapes into one polygon drawn with the active tool's style.
    ///
    /// # Errors
    ///
    /// See [`MergeResolver::merge`]. The store and selection are unchanged on error.
    pub fn merge_selection(&mut self) -> OverlayResult<AnnotationId> {
        let id = MergeResolver::merge(&mut self.store, &self.selection, self.tool.stroke_style())?;
        self.selection.clear();
        Ok(id)
    }

    /// Delete the selected annotations. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::AnnotationNotFound`] if a selected id vanished.
    pub fn delete_selection(&mut self) -> OverlayResult<usize> {
        if self.selection.is_empty() {
            return Ok(0);
        }
        let removed = self.store.remove(self.page, self.selection.ids())?;
        self.selection.clear();
        Ok(removed.len())
    }

    /// Move, scale or rotate one annotation on the current page.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::AnnotationNotFound`] or, for a degenerate
    /// transform, [`OverlayError::MalformedAnnotation`].
    pub fn set_transform(&mut self, id: &AnnotationId, transform: Transform) -> OverlayResult<()> {
        self.store.set_transform(self.page, id, transform)
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Preview artifacts for whatever is being drawn.
    #[must_use]
    pub fn previews(&self) -> Vec<PreviewArtifact> {
        let mut previews = self
            .session
            .preview(&self.tool, self.zoom, &self.config.preview);
        if let Some(line) = self.pending_line {
            previews.push(PreviewArtifact::PendingLine {
                start: line.start,
                end: line.end,
                color: self.tool.color,
                width: length_to_device(self.tool.stroke_width, self.zoom),
            });
        }
        previews
    }

    /// Full display list for the current page at the current zoom.
    #[must_use]
    pub fn display_list(&self) -> Vec<CanvasObject> {
        build_display_list(self.current_annotations(), self.zoom, self.previews())
    }
}
