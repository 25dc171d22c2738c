//! Space-tagged points.
//!
//! A [`Point`] carries a zero-sized marker for the coordinate frame it lives
//! in. [`CanonicalPoint`] is zoom = 1.0 page space and the only thing the
//! store persists; [`DevicePoint`] is pixels at whatever zoom is on screen.
//! Moving between the two goes through [`crate::normalize`].

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Marker trait for coordinate spaces.
pub trait Space: Copy + fmt::Debug + PartialEq + 'static {
    /// Short name used in log output.
    const NAME: &'static str;
}

/// Zoom-invariant page space (zoom = 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonical {}

/// Pixel space at the currently displayed zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {}

impl Space for Canonical {
    const NAME: &'static str = "canonical";
}

impl Space for Device {
    const NAME: &'static str = "device";
}

/// A 2D point in coordinate space `S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<S> {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

/// Point in canonical (zoom = 1.0) space.
pub type CanonicalPoint = Point<Canonical>;

/// Point in device (on-screen pixel) space.
pub type DevicePoint = Point<Device>;

impl<S> Point<S> {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    /// The origin of this space.
    #[must_use]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Euclidean distance to another point in the same space.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise comparison within `epsilon`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Convert to a `kurbo` point for affine math. The space tag is dropped,
    /// so callers must convert back with [`Point::from_kurbo`] in the same space.
    #[must_use]
    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }

    /// Build from a `kurbo` point known to be in space `S`.
    #[must_use]
    pub fn from_kurbo(p: kurbo::Point) -> Self {
        Self::new(p.x, p.y)
    }
}

impl<S: Space> fmt::Display for Point<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})@{}", self.x, self.y, S::NAME)
    }
}
