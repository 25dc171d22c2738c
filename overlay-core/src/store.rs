//! Page-partitioned annotation storage.
//!
//! [`AnnotationStore`] is the single source of truth for committed
//! annotations. Every mutation ends with a [`StoreChange`] delivered to the
//! registered listeners, so the rendering adapter and any counters can re-read
//! instead of tracking deltas.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId, PageIndex};
use crate::transform::Transform;
use crate::{OverlayError, OverlayResult};

/// What changed in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StoreChange {
    /// A page's whole list was replaced.
    PageReplaced {
        /// Affected page.
        page: PageIndex,
        /// Annotation count after the replace.
        count: usize,
    },
    /// One annotation was appended.
    Added {
        /// Affected page.
        page: PageIndex,
        /// New annotation.
        id: AnnotationId,
    },
    /// Annotations were removed.
    Removed {
        /// Affected page.
        page: PageIndex,
        /// Removed ids.
        ids: Vec<AnnotationId>,
    },
    /// Annotations were removed and one added in the same step.
    Replaced {
        /// Affected page.
        page: PageIndex,
        /// Removed ids.
        removed: Vec<AnnotationId>,
        /// Added annotation.
        added: AnnotationId,
    },
    /// An annotation's transform changed.
    Modified {
        /// Affected page.
        page: PageIndex,
        /// Modified annotation.
        id: AnnotationId,
    },
    /// Everything was dropped.
    Cleared,
}

impl StoreChange {
    /// The page affected, if the change is page-scoped.
    #[must_use]
    pub const fn page(&self) -> Option<PageIndex> {
        match self {
            Self::PageReplaced { page, .. }
            | Self::Added { page, .. }
            | Self::Removed { page, .. }
            | Self::Replaced { page, .. }
            | Self::Modified { page, .. } => Some(*page),
            Self::Cleared => None,
        }
    }
}

/// Change listener callback type.
pub type OnChangeCallback = Box<dyn Fn(&StoreChange) + Send + Sync>;

/// Outcome of loading annotations from an external source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Annotations accepted into the store.
    pub loaded: usize,
    /// Reasons for every entry that was skipped, in input order.
    pub skipped: Vec<String>,
}

impl LoadReport {
    /// Whether every entry loaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Committed annotations grouped by page, each page in insertion order.
#[derive(Default)]
pub struct AnnotationStore {
    pages: BTreeMap<PageIndex, Vec<Annotation>>,
    listeners: Vec<OnChangeCallback>,
}

impl fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("pages", &self.pages)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AnnotationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a change listener.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Move every listener registered on `other` onto this store, after the
    /// ones already here.
    pub fn adopt_listeners(&mut self, other: &mut Self) {
        self.listeners.append(&mut other.listeners);
    }

    fn notify(&self, change: &StoreChange) {
        tracing::trace!(?change, "store changed");
        for listener in &self.listeners {
            listener(change);
        }
    }

    /// Replace every annotation on `page`.
    ///
    /// The page field of each annotation is set to `page`. Nothing changes if
    /// any annotation is invalid or two share an id.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MalformedAnnotation`] or [`OverlayError::DuplicateId`].
    pub fn upsert_page(
        &mut self,
        page: PageIndex,
        mut annotations: Vec<Annotation>,
    ) -> OverlayResult<()> {
        let mut seen = HashSet::with_capacity(annotations.len());
        for annotation in &mut annotations {
            annotation.page = page;
            annotation.validate()?;
            if !seen.insert(annotation.id.clone()) {
                return Err(OverlayError::DuplicateId {
                    page: page.get(),
                    id: annotation.id.to_string(),
                });
            }
        }

        let count = annotations.len();
        if annotations.is_empty() {
            self.pages.remove(&page);
        } else {
            self.pages.insert(page, annotations);
        }
        tracing::debug!(%page, count, "page upserted");
        self.notify(&StoreChange::PageReplaced { page, count });
        Ok(())
    }

    /// Annotations on `page` in insertion order.
    #[must_use]
    pub fn by_page(&self, page: PageIndex) -> &[Annotation] {
        self.pages.get(&page).map_or(&[], Vec::as_slice)
    }

    /// Look up one annotation.
    #[must_use]
    pub fn get(&self, page: PageIndex, id: &AnnotationId) -> Option<&Annotation> {
        self.by_page(page).iter().find(|a| &a.id == id)
    }

    /// Append an annotation to its page.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MalformedAnnotation`] or [`OverlayError::DuplicateId`].
    pub fn add(&mut self, annotation: Annotation) -> OverlayResult<AnnotationId> {
        annotation.validate()?;
        let page = annotation.page;
        if self.get(page, &annotation.id).is_some() {
            return Err(OverlayError::DuplicateId {
                page: page.get(),
                id: annotation.id.to_string(),
            });
        }

        let id = annotation.id.clone();
        self.pages.entry(page).or_default().push(annotation);
        tracing::debug!(%page, %id, "annotation added");
        self.notify(&StoreChange::Added {
            page,
            id: id.clone(),
        });
        Ok(id)
    }

    /// Remove annotations from a page. All ids must exist or nothing is removed.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::AnnotationNotFound`] naming the first missing id.
    pub fn remove(
        &mut self,
        page: PageIndex,
        ids: &[AnnotationId],
    ) -> OverlayResult<Vec<Annotation>> {
        self.check_present(page, ids)?;
        let removed = self.take(page, ids);
        tracing::debug!(%page, count = removed.len(), "annotations removed");
        self.notify(&StoreChange::Removed {
            page,
            ids: ids.to_vec(),
        });
        Ok(removed)
    }

    /// Remove `ids` and append `addition` on the same page as one step.
    ///
    /// No listener ever sees the page with both the old and new shapes, and
    /// on error the page is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::AnnotationNotFound`], [`OverlayError::MalformedAnnotation`]
    /// or [`OverlayError::DuplicateId`].
    pub fn replace(
        &mut self,
        page: PageIndex,
        ids: &[AnnotationId],
        addition: Annotation,
    ) -> OverlayResult<AnnotationId> {
        addition.validate()?;
        if addition.page != page {
            return Err(OverlayError::MalformedAnnotation(format!(
                "annotation for page {} replaced into page {page}",
                addition.page
            )));
        }
        self.check_present(page, ids)?;
        if !ids.contains(&addition.id) && self.get(page, &addition.id).is_some() {
            return Err(OverlayError::DuplicateId {
                page: page.get(),
                id: addition.id.to_string(),
            });
        }

        self.take(page, ids);
        let added = addition.id.clone();
        self.pages.entry(page).or_default().push(addition);
        tracing::debug!(%page, removed = ids.len(), %added, "annotations replaced");
        self.notify(&StoreChange::Replaced {
            page,
            removed: ids.to_vec(),
            added: added.clone(),
        });
        Ok(added)
    }

    /// Set the transform of one annotation.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::AnnotationNotFound`] or, for a degenerate
    /// transform, [`OverlayError::MalformedAnnotation`].
    pub fn set_transform(
        &mut self,
        page: PageIndex,
        id: &AnnotationId,
        transform: Transform,
    ) -> OverlayResult<()> {
        if !transform.is_valid() {
            return Err(OverlayError::MalformedAnnotation("degenerate transform".to_string()));
        }
        let annotation = self
            .pages
            .get_mut(&page)
            .and_then(|list| list.iter_mut().find(|a| &a.id == id))
            .ok_or_else(|| OverlayError::AnnotationNotFound(id.to_string()))?;
        annotation.transform = transform;
        self.notify(&StoreChange::Modified {
            page,
            id: id.clone(),
        });
        Ok(())
    }

    fn check_present(&self, page: PageIndex, ids: &[AnnotationId]) -> OverlayResult<()> {
        match ids.iter().find(|id| self.get(page, id).is_none()) {
            Some(missing) => Err(OverlayError::AnnotationNotFound(missing.to_string())),
            None => Ok(()),
        }
    }

    fn take(&mut self, page: PageIndex, ids: &[AnnotationId]) -> Vec<Annotation> {
        let Some(list) = self.pages.get_mut(&page) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(list)
            .into_iter()
            .partition(|a| ids.contains(&a.id));
        if kept.is_empty() {
            self.pages.remove(&page);
        } else {
            *list = kept;
        }
        removed
    }

    /// Every page with annotations, in page order.
    #[must_use]
    pub fn all_annotations(&self) -> &BTreeMap<PageIndex, Vec<Annotation>> {
        &self.pages
    }

    /// Pages that currently hold annotations.
    pub fn pages(&self) -> impl Iterator<Item = PageIndex> + '_ {
        self.pages.keys().copied()
    }

    /// Total annotation count across pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Whether the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Drop every annotation.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.notify(&StoreChange::Cleared);
    }

    /// Load one page from untrusted JSON, replacing what the page held.
    ///
    /// Entries with missing or invalid geometry, a different page, or a
    /// repeated id are skipped and logged; the rest of the page still loads.
    pub fn load_page(&mut self, page: PageIndex, values: Vec<serde_json::Value>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut accepted: Vec<Annotation> = Vec::with_capacity(values.len());

        for (index, value) in values.into_iter().enumerate() {
            let reason = match Annotation::from_value(value) {
                Ok(annotation) if annotation.page != page => {
                    format!("entry {index}: belongs to page {}", annotation.page)
                }
                Ok(annotation) if accepted.iter().any(|a| a.id == annotation.id) => {
                    format!("entry {index}: duplicate id {}", annotation.id)
                }
                Ok(annotation) => {
                    accepted.push(annotation);
                    continue;
                }
                Err(e) => format!("entry {index}: {e}"),
            };
            tracing::warn!(%page, "skipping annotation: {reason}");
            report.skipped.push(reason);
        }

        report.loaded = accepted.len();
        let count = accepted.len();
        if accepted.is_empty() {
            self.pages.remove(&page);
        } else {
            self.pages.insert(page, accepted);
        }
        self.notify(&StoreChange::PageReplaced { page, count });
        report
    }

    /// Load a flat list of annotations for any number of pages.
    ///
    /// Entries are grouped by their own `page` field; entries whose page
    /// cannot be read are skipped like any other malformed entry.
    pub fn load(&mut self, values: Vec<serde_json::Value>) -> LoadReport {
        let mut by_page: BTreeMap<PageIndex, Vec<serde_json::Value>> = BTreeMap::new();
        let mut report = LoadReport::default();

        for (index, value) in values.into_iter().enumerate() {
            let page = value
                .get("page")
                .and_then(serde_json::Value::as_u64)
                .and_then(|p| u32::try_from(p).ok())
                .and_then(|p| PageIndex::new(p).ok());
            if let Some(page) = page {
                by_page.entry(page).or_default().push(value);
            } else {
                let reason = format!("entry {index}: missing or invalid page");
                tracing::warn!("skipping annotation: {reason}");
                report.skipped.push(reason);
            }
        }

        for (page, values) in by_page {
            let page_report = self.load_page(page, values);
            report.loaded += page_report.loaded;
            report.skipped.extend(page_report.skipped);
        }
        report
    }

    /// Serialize every annotation as one flat JSON array, page by page.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> OverlayResult<String> {
        let flat: Vec<&Annotation> = self.pages.values().flatten().collect();
        serde_json::to_string_pretty(&flat).map_err(OverlayError::Serialization)
    }

    /// Build a store from a flat JSON array, skipping malformed entries.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Serialization`] if the input is not a JSON array.
    pub fn from_json(json: &str) -> OverlayResult<(Self, LoadReport)> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let mut store = Self::new();
        let report = store.load(values);
        Ok((store, report))
    }
}
