//! Geometry normalizer: the only place zoom arithmetic is written.
//!
//! `to_canonical(p, z) = p / z` and `to_device(p, z) = p * z`, applied the same
//! way to points, stroke widths and translate offsets. Every other module goes
//! through these functions so capture-time and render-time scaling cannot
//! drift apart.

use serde::{Deserialize, Serialize};

use crate::geometry::{CanonicalPoint, DevicePoint};
use crate::{OverlayError, OverlayResult};

/// A validated zoom factor (finite and strictly positive).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Zoom(f64);

impl Zoom {
    /// The canonical baseline, 100%.
    pub const IDENTITY: Self = Self(1.0);

    /// Validate a raw zoom factor.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::InvalidZoom`] if `factor` is not finite or `<= 0`.
    pub fn new(factor: f64) -> OverlayResult<Self> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self(factor))
        } else {
            Err(OverlayError::InvalidZoom(factor))
        }
    }

    /// The raw factor.
    #[must_use]
    pub const fn factor(self) -> f64 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TryFrom<f64> for Zoom {
    type Error = OverlayError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Zoom> for f64 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

/// Convert a device-space point to canonical space.
#[must_use]
pub fn to_canonical(p: DevicePoint, zoom: Zoom) -> CanonicalPoint {
    CanonicalPoint::new(p.x / zoom.0, p.y / zoom.0)
}

/// Convert a canonical point to device space.
#[must_use]
pub fn to_device(p: CanonicalPoint, zoom: Zoom) -> DevicePoint {
    DevicePoint::new(p.x * zoom.0, p.y * zoom.0)
}

/// Convert a batch of device points, preserving order.
#[must_use]
pub fn points_to_canonical(points: &[DevicePoint], zoom: Zoom) -> Vec<CanonicalPoint> {
    points.iter().map(|p| to_canonical(*p, zoom)).collect()
}

/// Convert a batch of canonical points, preserving order.
#[must_use]
pub fn points_to_device(points: &[CanonicalPoint], zoom: Zoom) -> Vec<DevicePoint> {
    points.iter().map(|p| to_device(*p, zoom)).collect()
}

/// Convert a device-space length (stroke width, offset, radius) to canonical.
#[must_use]
pub fn length_to_canonical(length: f64, zoom: Zoom) -> f64 {
    length / zoom.0
}

/// Convert a canonical length to device space.
#[must_use]
pub fn length_to_device(length: f64, zoom: Zoom) -> f64 {
    length * zoom.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_invalid_zoom_rejected() {
        assert!(matches!(Zoom::new(0.0), Err(OverlayError::InvalidZoom(_))));
        assert!(matches!(Zoom::new(-1.5), Err(OverlayError::InvalidZoom(_))));
        assert!(matches!(
            Zoom::new(f64::NAN),
            Err(OverlayError::InvalidZoom(_))
        ));
        assert!(matches!(
            Zoom::new(f64::INFINITY),
            Err(OverlayError::InvalidZoom(_))
        ));
    }

    #[test]
    fn test_zoom_deserialize_validates() {
        let ok: Zoom = serde_json::from_str("2.0").expect("valid zoom");
        assert!((ok.factor() - 2.0).abs() < EPS);
        assert!(serde_json::from_str::<Zoom>("0.0").is_err());
    }

    #[test]
    fn test_to_device_at_double_zoom() {
        let zoom = Zoom::new(2.0).expect("zoom");
        let p = to_device(CanonicalPoint::new(30.0, 40.0), zoom);
        assert!(p.approx_eq(&DevicePoint::new(60.0, 80.0), EPS));
    }

    #[test]
    fn test_stroke_width_scales_like_points() {
        let zoom = Zoom::new(1.5).expect("zoom");
        let canonical = length_to_canonical(3.0, zoom);
        assert!((canonical - 2.0).abs() < EPS);
        assert!((length_to_device(canonical, zoom) - 3.0).abs() < EPS);
    }

    #[test]
    fn test_batch_preserves_order() {
        let zoom = Zoom::new(0.5).expect("zoom");
        let device = [DevicePoint::new(1.0, 2.0), DevicePoint::new(3.0, 4.0)];
        let canonical = points_to_canonical(&device, zoom);
        assert!(canonical[0].approx_eq(&CanonicalPoint::new(2.0, 4.0), EPS));
        assert!(canonical[1].approx_eq(&CanonicalPoint::new(6.0, 8.0), EPS));
    }

    proptest! {
        #[test]
        fn prop_round_trip(x in -1.0e5f64..1.0e5, y in -1.0e5f64..1.0e5, z in 0.01f64..16.0) {
            let zoom = Zoom::new(z).expect("zoom");
            let p = DevicePoint::new(x, y);
            let back = to_device(to_canonical(p, zoom), zoom);
            let tol = 1e-9 * (1.0 + x.abs().max(y.abs()));
            prop_assert!(back.approx_eq(&p, tol));
        }

        #[test]
        fn prop_zoom_invariance(
            x in -1.0e4f64..1.0e4,
            y in -1.0e4f64..1.0e4,
            z1 in 0.05f64..8.0,
            z2 in 0.05f64..8.0,
        ) {
            let z1 = Zoom::new(z1).expect("zoom");
            let z2 = Zoom::new(z2).expect("zoom");
            let stored = CanonicalPoint::new(x, y);

            // Render at z1, recapture, render at z2.
            let via_z1 = to_device(to_canonical(to_device(stored, z1), z1), z2);
            let direct = to_device(stored, z2);
            let tol = 1e-9 * (1.0 + x.abs().max(y.abs())) * z2.factor().max(1.0);
            prop_assert!(via_z1.approx_eq(&direct, tol));
        }
    }
}
