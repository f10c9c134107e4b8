//! Dense displacement field transform.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DtkError, Result};
use crate::image::VectorField;
use crate::interpolation::LinearInterpolator;
use crate::spatial::{Matrix3, Point3, Vector3};
use crate::transform::Transform;

/// How a displacement field may be inverted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InversionPolicy {
    /// Permit fixed-point inversion of dense fields.
    pub allow_iterative: bool,
    pub max_iterations: usize,
    /// Convergence threshold in voxels.
    pub tolerance: f64,
}

impl Default for InversionPolicy {
    fn default() -> Self {
        Self {
            allow_iterative: true,
            max_iterations: 50,
            tolerance: 1e-4,
        }
    }
}

impl InversionPolicy {
    pub fn with_iterative(mut self, allow: bool) -> Self {
        self.allow_iterative = allow;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldDirection {
    Forward,
    Inverse { max_iterations: usize, tolerance: f64 },
}

/// `T(x) = x + u(x)` for a displacement field `u` sampled trilinearly.
///
/// Outside the field's buffer the displacement is zero. The inverse
/// direction solves `y + u(y) = x` by fixed-point iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementFieldTransform {
    field: VectorField,
    direction: FieldDirection,
}

impl DisplacementFieldTransform {
    pub fn new(field: VectorField) -> Self {
        Self {
            field,
            direction: FieldDirection::Forward,
        }
    }

    pub fn field(&self) -> &VectorField {
        &self.field
    }

    pub fn into_field(self) -> VectorField {
        self.field
    }

    pub fn is_inverted(&self) -> bool {
        matches!(self.direction, FieldDirection::Inverse { .. })
    }

    /// Displacement at a physical point.
    pub fn displacement(&self, point: &Point3) -> Vector3 {
        LinearInterpolator::sample_vector(&self.field, point)
    }

    /// Inverted transform.
    ///
    /// # Errors
    /// Returns `UnsupportedInversion` when the policy forbids iterative
    /// inversion of a forward field.
    pub fn inverse(self, policy: &InversionPolicy) -> Result<Self> {
        let direction = match self.direction {
            FieldDirection::Inverse { .. } => FieldDirection::Forward,
            FieldDirection::Forward if policy.allow_iterative => {
                warn!("Dense displacement field has no exact inverse; using fixed-point inversion");
                FieldDirection::Inverse {
                    max_iterations: policy.max_iterations,
                    tolerance: policy.tolerance,
                }
            }
            FieldDirection::Forward => {
                return Err(DtkError::unsupported_inversion(
                    "dense displacement field inversion requires iterative inversion",
                ))
            }
        };
        Ok(Self {
            field: self.field,
            direction,
        })
    }

    /// Jacobian of the forward map `x + u(x)` by central differences.
    fn forward_jacobian(&self, point: &Point3) -> Matrix3 {
        let h = 0.5 * self.field.geometry().min_spacing();
        let mut gradient = Matrix3::zeros();
        for axis in 0..3 {
            let mut step = Vector3::zeros();
            step[axis] = h;
            let derivative =
                (self.displacement(&(point + step)) - self.displacement(&(point - step))) / (2.0 * h);
            gradient.set_column(axis, &derivative);
        }
        Matrix3::identity() + gradient
    }

    fn invert_point(&self, point: &Point3, max_iterations: usize, tolerance: f64) -> Point3 {
        let threshold = tolerance * self.field.geometry().min_spacing();
        let mut estimate = point - self.displacement(point);
        for _ in 0..max_iterations {
            let next = point - self.displacement(&estimate);
            let change = (next - estimate).norm();
            estimate = next;
            if change < threshold {
                break;
            }
        }
        estimate
    }
}

impl Transform for DisplacementFieldTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        match self.direction {
            FieldDirection::Forward => point + self.displacement(point),
            FieldDirection::Inverse {
                max_iterations,
                tolerance,
            } => self.invert_point(point, max_iterations, tolerance),
        }
    }

    fn jacobian(&self, point: &Point3) -> Matrix3 {
        match self.direction {
            FieldDirection::Forward => self.forward_jacobian(point),
            FieldDirection::Inverse {
                max_iterations,
                tolerance,
            } => {
                let preimage = self.invert_point(point, max_iterations, tolerance);
                self.forward_jacobian(&preimage)
                    .try_inverse()
                    .unwrap_or_else(Matrix3::identity)
            }
        }
    }
}
