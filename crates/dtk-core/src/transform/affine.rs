//! Affine transform implementation.

use crate::error::{DtkError, Result};
use crate::spatial::{Matrix3, Point3, Vector3};
use crate::transform::Transform;

/// Affine transform `T(x) = A x + b`.
///
/// Centred parameterisations `T(x) = A (x - c) + c + t` are folded into the
/// offset on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix3,
    offset: Vector3,
}

impl AffineTransform {
    pub fn new(matrix: Matrix3, offset: Vector3) -> Self {
        Self { matrix, offset }
    }

    /// Build from a matrix, translation and fixed centre.
    pub fn from_center(matrix: Matrix3, translation: Vector3, center: Point3) -> Self {
        let offset = translation + center.coords - matrix * center.coords;
        Self { matrix, offset }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    pub fn translation(offset: Vector3) -> Self {
        Self::new(Matrix3::identity(), offset)
    }

    pub fn matrix(&self) -> &Matrix3 {
        &self.matrix
    }

    pub fn offset(&self) -> &Vector3 {
        &self.offset
    }

    /// Exact inverse.
    ///
    /// # Errors
    /// Fails when the matrix is singular.
    pub fn inverse(&self) -> Result<Self> {
        let inverse = self
            .matrix
            .try_inverse()
            .ok_or_else(|| DtkError::unsupported_inversion("affine matrix is singular"))?;
        Ok(Self::new(inverse, -(inverse * self.offset)))
    }

    /// `self ∘ other`: apply `other` first.
    pub fn compose(&self, other: &AffineTransform) -> Self {
        Self::new(self.matrix * other.matrix, self.matrix * other.offset + self.offset)
    }
}

impl Transform for AffineTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        Point3::from(self.matrix * point.coords + self.offset)
    }

    fn jacobian(&self, _point: &Point3) -> Matrix3 {
        self.matrix
    }
}
