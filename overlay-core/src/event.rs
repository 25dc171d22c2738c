//! Input events raised by the rendering adapter.

use serde::{Deserialize, Serialize};

use crate::geometry::DevicePoint;

/// Pointer input on a page surface, in device space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InputEvent {
    /// Button pressed.
    PointerDown(DevicePoint),
    /// Pointer moved (with or without a button held).
    PointerMove(DevicePoint),
    /// Button released.
    PointerUp(DevicePoint),
    /// Double click.
    DoubleClick(DevicePoint),
    /// Explicit cancellation (e.g. Escape).
    Cancel,
}

impl InputEvent {
    /// The pointer position, if the event carries one.
    #[must_use]
    pub const fn position(&self) -> Option<DevicePoint> {
        match self {
            Self::PointerDown(p)
            | Self::PointerMove(p)
            | Self::PointerUp(p)
            | Self::DoubleClick(p) => Some(*p),
            Self::Cancel => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json() {
        let event = InputEvent::PointerDown(DevicePoint::new(4.0, 8.0));
        let json = serde_json::to_value(event).expect("serialize");
        assert_eq!(json["type"], "pointer_down");
        assert_eq!(json["data"]["x"], 4.0);

        let back: InputEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_cancel_has_no_position() {
        assert!(InputEvent::Cancel.position().is_none());
        assert!(InputEvent::DoubleClick(DevicePoint::origin()).position().is_some());
    }
}
