//! Affine placement of an annotation's local geometry.

use kurbo::Affine;
use serde::{Deserialize, Serialize};

use crate::geometry::{CanonicalPoint, Point};

/// Translate + scale + rotation applied on top of an annotation's geometry.
///
/// Applied in the order scale, then rotate, then translate, so a point `p`
/// maps to `T · R · S · p`. The translation is expressed in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Offset in canonical units.
    #[serde(default = "CanonicalPoint::origin")]
    pub translate: CanonicalPoint,
    /// Horizontal scale factor.
    #[serde(default = "Transform::unit_scale")]
    pub scale_x: f64,
    /// Vertical scale factor.
    #[serde(default = "Transform::unit_scale")]
    pub scale_y: f64,
    /// Clockwise rotation (y-down) in degrees.
    #[serde(default)]
    pub rotation_degrees: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        translate: Point::new(0.0, 0.0),
        scale_x: 1.0,
        scale_y: 1.0,
        rotation_degrees: 0.0,
    };

    const fn unit_scale() -> f64 {
        1.0
    }

    /// Pure translation.
    #[must_use]
    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self {
            translate: Point::new(dx, dy),
            ..Self::IDENTITY
        }
    }

    /// Set the scale factors.
    #[must_use]
    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    /// Set the rotation.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// Whether this is exactly the identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Whether every component is finite and neither scale collapses an axis.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.translate.is_finite()
            && self.scale_x.is_finite()
            && self.scale_y.is_finite()
            && self.rotation_degrees.is_finite()
            && self.scale_x != 0.0
            && self.scale_y != 0.0
    }

    /// The equivalent affine matrix.
    #[must_use]
    pub fn to_affine(&self) -> Affine {
        Affine::translate((self.translate.x, self.translate.y))
            * Affine::rotate(self.rotation_degrees.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Map a canonical point through this transform.
    #[must_use]
    pub fn apply(&self, p: CanonicalPoint) -> CanonicalPoint {
        CanonicalPoint::from_kurbo(self.to_affine() * p.to_kurbo())
    }
}

/// Map local canonical points through an affine matrix, preserving order.
#[must_use]
pub fn map_points(matrix: Affine, points: &[CanonicalPoint]) -> Vec<CanonicalPoint> {
    points
        .iter()
        .map(|p| CanonicalPoint::from_kurbo(matrix * p.to_kurbo()))
        .collect()
}
