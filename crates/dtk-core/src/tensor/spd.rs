//! SPD matrix logarithm / exponential codec.
//!
//! Tensors are stored as six scalars in lower-triangular row order
//! `(xx, xy, yy, xz, yz, zz)`. Log-tensors scale their off-diagonal terms so
//! that the Euclidean distance between component vectors equals the
//! Frobenius distance between the symmetric matrices.

use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

use crate::error::{DtkError, Result};
use crate::spatial::{Matrix3, Vector3};
use crate::tensor::eigen::{map_eigenvalues, reconstruct, sorted_eigen};

/// Off-diagonal scale applied to log-tensors unless disabled.
pub const DEFAULT_OFF_DIAGONAL_SCALE: f64 = SQRT_2;

/// Default lower bound for eigenvalues accepted by the codec.
pub const DEFAULT_EIGENVALUE_FLOOR: f64 = 1e-16;

/// Symmetric positive-definite 3x3 tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpdTensor(pub [f64; 6]);

/// Matrix logarithm of an SPD tensor, off-diagonals scaled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LogTensor(pub [f64; 6]);

impl SpdTensor {
    pub fn identity() -> Self {
        Self([1.0, 0.0, 1.0, 0.0, 0.0, 1.0])
    }

    pub fn from_matrix(matrix: &Matrix3) -> Self {
        Self(pack(matrix, 1.0))
    }

    pub fn to_matrix(&self) -> Matrix3 {
        unpack(&self.0, 1.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }

    /// Eigenvalues in decreasing order.
    pub fn eigenvalues(&self) -> Vector3 {
        sorted_eigen(&self.to_matrix()).0
    }
}

impl LogTensor {
    pub fn zeros() -> Self {
        Self([0.0; 6])
    }

    pub fn from_matrix(matrix: &Matrix3, off_diagonal_scale: f64) -> Self {
        Self(pack(matrix, off_diagonal_scale))
    }

    pub fn to_matrix(&self, off_diagonal_scale: f64) -> Matrix3 {
        unpack(&self.0, off_diagonal_scale)
    }

    /// `self += weight * other`, component-wise.
    pub fn add_scaled(&mut self, other: &LogTensor, weight: f64) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += weight * b;
        }
    }

    pub fn scale(&mut self, factor: f64) {
        self.0.iter_mut().for_each(|c| *c *= factor);
    }
}

fn pack(matrix: &Matrix3, off_diagonal_scale: f64) -> [f64; 6] {
    let off = |r: usize, c: usize| 0.5 * (matrix[(r, c)] + matrix[(c, r)]) * off_diagonal_scale;
    [
        matrix[(0, 0)],
        off(1, 0),
        matrix[(1, 1)],
        off(2, 0),
        off(2, 1),
        matrix[(2, 2)],
    ]
}

fn unpack(components: &[f64; 6], off_diagonal_scale: f64) -> Matrix3 {
    let [xx, xy, yy, xz, yz, zz] = *components;
    let (xy, xz, yz) = (
        xy / off_diagonal_scale,
        xz / off_diagonal_scale,
        yz / off_diagonal_scale,
    );
    Matrix3::new(xx, xy, xz, xy, yy, yz, xz, yz, zz)
}

/// What to do with tensors whose smallest eigenvalue is below the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClampPolicy {
    /// Raise offending eigenvalues to the floor.
    #[default]
    Clamp,
    /// Fail with `NonPositiveDefiniteInput`.
    Reject,
}

/// Result of logging one tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogOutcome {
    pub tensor: LogTensor,
    pub clamped: bool,
}

/// Log/exp codec between [`SpdTensor`] and [`LogTensor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpdCodec {
    off_diagonal_scale: f64,
    eigenvalue_floor: f64,
    policy: ClampPolicy,
}

impl Default for SpdCodec {
    fn default() -> Self {
        Self {
            off_diagonal_scale: DEFAULT_OFF_DIAGONAL_SCALE,
            eigenvalue_floor: DEFAULT_EIGENVALUE_FLOOR,
            policy: ClampPolicy::Clamp,
        }
    }
}

impl SpdCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store log-tensor off-diagonals unscaled.
    pub fn without_off_diagonal_scaling(self) -> Self {
        self.with_off_diagonal_scale(1.0)
    }

    pub fn with_off_diagonal_scale(mut self, scale: f64) -> Self {
        self.off_diagonal_scale = scale;
        self
    }

    pub fn with_eigenvalue_floor(mut self, floor: f64) -> Self {
        self.eigenvalue_floor = floor;
        self
    }

    pub fn with_policy(mut self, policy: ClampPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn off_diagonal_scale(&self) -> f64 {
        self.off_diagonal_scale
    }

    pub fn eigenvalue_floor(&self) -> f64 {
        self.eigenvalue_floor
    }

    pub fn policy(&self) -> ClampPolicy {
        self.policy
    }

    /// Matrix logarithm of an SPD tensor.
    ///
    /// # Errors
    /// Returns `NonPositiveDefiniteInput` for non-finite input, and for
    /// eigenvalues at or below the floor under [`ClampPolicy::Reject`].
    pub fn log(&self, tensor: &SpdTensor) -> Result<LogOutcome> {
        if !tensor.is_finite() {
            return Err(DtkError::NonPositiveDefiniteInput {
                min_eigenvalue: f64::NAN,
            });
        }

        let (values, vectors) = sorted_eigen(&tensor.to_matrix());
        let min_eigenvalue = values[2];
        let clamped = min_eigenvalue <= self.eigenvalue_floor;
        if clamped && self.policy == ClampPolicy::Reject {
            return Err(DtkError::NonPositiveDefiniteInput { min_eigenvalue });
        }

        let floor = self.eigenvalue_floor;
        let logged = values.map(|v| v.max(floor).ln());
        Ok(LogOutcome {
            tensor: LogTensor::from_matrix(&reconstruct(&logged, &vectors), self.off_diagonal_scale),
            clamped,
        })
    }

    /// Matrix exponential of a log-tensor; always SPD.
    pub fn exp(&self, log: &LogTensor) -> SpdTensor {
        SpdTensor::from_matrix(&map_eigenvalues(&log.to_matrix(self.off_diagonal_scale), f64::exp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative_error(a: &SpdTensor, b: &SpdTensor) -> f64 {
        (a.to_matrix() - b.to_matrix()).norm() / b.to_matrix().norm()
    }

    #[test]
    fn test_identity_logs_to_zero() {
        let codec = SpdCodec::default();
        let outcome = codec.log(&SpdTensor::identity()).unwrap();

        assert!(!outcome.clamped);
        assert!(outcome.tensor.0.iter().all(|c| c.abs() < 1e-14));
    }

    #[test]
    fn test_roundtrip_anisotropic() {
        let codec = SpdCodec::default();
        let tensor = SpdTensor([3.0, 0.5, 2.0, 0.1, -0.3, 1.0]);

        let log = codec.log(&tensor).unwrap().tensor;
        let back = codec.exp(&log);

        assert!(relative_error(&back, &tensor) < 1e-12);
    }

    #[test]
    fn test_roundtrip_nearly_repeated_eigenvalues() {
        let codec = SpdCodec::default();
        let rotation = nalgebra::Rotation3::from_euler_angles(0.0, 0.84149, -1.45378).into_inner();
        let diagonal = Matrix3::from_diagonal(&Vector3::new(8.53576, 0.01, 8.56939));
        let tensor = SpdTensor::from_matrix(&(rotation * diagonal * rotation.transpose()));

        let log = codec.log(&tensor).unwrap().tensor;
        let back = codec.exp(&log);

        assert!(relative_error(&back, &tensor) < 1e-12);
    }

    #[test]
    fn test_off_diagonal_scaling_preserves_frobenius_norm() {
        let codec = SpdCodec::default();
        let tensor = SpdTensor([2.0, 0.7, 1.5, 0.2, 0.4, 0.9]);
        let log = codec.log(&tensor).unwrap().tensor;

        let vector_norm = log.0.iter().map(|c| c * c).sum::<f64>().sqrt();
        let matrix_norm = log.to_matrix(codec.off_diagonal_scale()).norm();
        assert!((vector_norm - matrix_norm).abs() < 1e-12);
    }

    #[test]
    fn test_unscaled_codec() {
        let codec = SpdCodec::default().without_off_diagonal_scaling();
        let tensor = SpdTensor::from_matrix(&Matrix3::from_diagonal(&Vector3::new(
            std::f64::consts::E,
            1.0,
            1.0,
        )));
        let log = codec.log(&tensor).unwrap().tensor;
        assert!((log.0[0] - 1.0).abs() < 1e-12);
        assert!(relative_error(&codec.exp(&log), &tensor) < 1e-12);
    }

    #[test]
    fn test_clamp_policy() {
        let tensor = SpdTensor([1.0, 0.0, 1.0, 0.0, 0.0, -1.0]);

        let outcome = SpdCodec::default().log(&tensor).unwrap();
        assert!(outcome.clamped);
        assert!(outcome.tensor.0.iter().all(|c| c.is_finite()));
        assert!(SpdCodec::default().exp(&outcome.tensor).eigenvalues()[2] > 0.0);

        let rejected = SpdCodec::default()
            .with_policy(ClampPolicy::Reject)
            .log(&tensor);
        match rejected {
            Err(DtkError::NonPositiveDefiniteInput { min_eigenvalue }) => {
                assert!((min_eigenvalue + 1.0).abs() < 1e-12)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_input_is_error() {
        let tensor = SpdTensor([f64::NAN, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert!(SpdCodec::default().log(&tensor).is_err());
    }
}
