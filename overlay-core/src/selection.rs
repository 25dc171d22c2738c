//! Selection sets reported by the rendering adapter.

use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationId, PageIndex};
use crate::geometry::DevicePoint;
use crate::normalize::{to_canonical, Zoom};
use crate::transform::Transform;

/// Annotations currently selected on one page, in selection order.
///
/// `group` is the transform of the selection as a whole (an adapter that lets
/// the user drag several shapes at once applies it on top of each shape's own
/// transform until the drag is flushed to the store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSet {
    /// Page all selected annotations live on.
    pub page: PageIndex,
    ids: Vec<AnnotationId>,
    /// Ancestor transform shared by every selected shape.
    #[serde(default)]
    pub group: Transform,
}

impl SelectionSet {
    /// Empty selection on a page.
    #[must_use]
    pub fn empty(page: PageIndex) -> Self {
        Self {
            page,
            ids: Vec::new(),
            group: Transform::IDENTITY,
        }
    }

    /// Selection of `ids` in the given order. Repeated ids keep their first position.
    #[must_use]
    pub fn new(page: PageIndex, ids: impl IntoIterator<Item = AnnotationId>) -> Self {
        let mut selection = Self::empty(page);
        for id in ids {
            selection.push(id);
        }
        selection
    }

    /// Append an id unless already selected.
    pub fn push(&mut self, id: AnnotationId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Set the group transform.
    #[must_use]
    pub fn with_group(mut self, group: Transform) -> Self {
        self.group = group;
        self
    }

    /// Set the group transform to a drag offset measured on screen.
    #[must_use]
    pub fn with_device_offset(self, offset: DevicePoint, zoom: Zoom) -> Self {
        let delta = to_canonical(offset, zoom);
        self.with_group(Transform::translation(delta.x, delta.y))
    }

    /// Selected ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[AnnotationId] {
        &self.ids
    }

    /// Number of selected annotations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.ids.contains(id)
    }

    /// Drop every id.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.group = Transform::IDENTITY;
    }

    /// The group transform, or `None` when it is the identity.
    #[must_use]
    pub fn group_transform(&self) -> Option<&Transform> {
        (!self.group.is_identity()).then_some(&self.group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CanonicalPoint;

    #[test]
    fn test_order_kept_and_duplicates_dropped() {
        let a = AnnotationId::from_string("1-0");
        let b = AnnotationId::from_string("1-1");
        let selection = SelectionSet::new(PageIndex::FIRST, [b.clone(), a.clone(), b.clone()]);
        assert_eq!(selection.ids(), &[b, a]);
    }

    #[test]
    fn test_device_offset_is_normalized() {
        let zoom = Zoom::new(2.0).expect("zoom");
        let selection = SelectionSet::empty(PageIndex::FIRST)
            .with_device_offset(DevicePoint::new(20.0, -10.0), zoom);
        let group = selection.group_transform().expect("non-identity");
        assert!(group.translate.approx_eq(&CanonicalPoint::new(10.0, -5.0), 1e-9));
    }
}
