//! Anisotropic tensor reorientation.
//!
//! Both strategies act on the log-tensor matrix directly: conjugation by an
//! orthogonal matrix commutes with the matrix logarithm, and PPD keeps the
//! eigenvalues, so rebuilding from log-eigenvalues is equivalent.

use serde::{Deserialize, Serialize};

use crate::spatial::{Matrix3, Vector3};
use crate::tensor::eigen::{reconstruct, sorted_eigen};

/// Reorientation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reorientation {
    /// Orthogonal factor of the polar decomposition of `F`.
    #[default]
    FiniteStrain,
    /// Preservation of principal direction.
    PreservationOfPrincipalDirection,
}

impl Reorientation {
    /// Reorient a symmetric matrix by the deformation gradient `F`.
    ///
    /// Returns `None` when `F` is degenerate.
    pub fn apply(&self, matrix: &Matrix3, deformation: &Matrix3) -> Option<Matrix3> {
        match self {
            Reorientation::FiniteStrain => {
                let rotation = polar_rotation(deformation)?;
                Some(rotation * matrix * rotation.transpose())
            }
            Reorientation::PreservationOfPrincipalDirection => {
                preserve_principal_direction(matrix, deformation)
            }
        }
    }
}

/// Orthogonal factor `Q = U V^T` of `F = Q S`.
pub fn polar_rotation(deformation: &Matrix3) -> Option<Matrix3> {
    let svd = deformation.svd(true, true);
    if svd.singular_values.iter().any(|s| !s.is_finite() || *s <= f64::EPSILON) {
        return None;
    }
    Some(svd.u? * svd.v_t?)
}

fn preserve_principal_direction(matrix: &Matrix3, deformation: &Matrix3) -> Option<Matrix3> {
    let (values, vectors) = sorted_eigen(matrix);

    let mapped_first: Vector3 = deformation * vectors.column(0);
    let first = mapped_first.try_normalize(f64::EPSILON)?;

    let mapped_second: Vector3 = deformation * vectors.column(1);
    let second = (mapped_second - first * first.dot(&mapped_second)).try_normalize(f64::EPSILON)?;

    let third = first.cross(&second);
    Some(reconstruct(&values, &Matrix3::from_columns(&[first, second, third])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    fn anisotropic() -> Matrix3 {
        Matrix3::from_diagonal(&Vector3::new(2.0, 0.5, -1.0))
    }

    #[test]
    fn test_polar_rotation_of_rotation() {
        let rotation = Rotation3::from_euler_angles(0.2, -0.4, 1.1).into_inner();
        let extracted = polar_rotation(&(rotation * 3.0)).unwrap();
        assert!((extracted - rotation).norm() < 1e-12);
    }

    #[test]
    fn test_polar_rotation_ignores_stretch() {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.5).into_inner();
        let stretch = Matrix3::new(2.0, 0.3, 0.0, 0.3, 1.0, 0.0, 0.0, 0.0, 0.5);
        let extracted = polar_rotation(&(rotation * stretch)).unwrap();
        assert!((extracted - rotation).norm() < 1e-10);
    }

    #[test]
    fn test_singular_deformation() {
        let singular = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 0.0));
        assert!(polar_rotation(&singular).is_none());
    }

    #[test]
    fn test_modes_agree_on_rotation() {
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.8).into_inner();
        let expected = rotation * anisotropic() * rotation.transpose();

        for mode in [
            Reorientation::FiniteStrain,
            Reorientation::PreservationOfPrincipalDirection,
        ] {
            let result = mode.apply(&anisotropic(), &rotation).unwrap();
            assert!((result - expected).norm() < 1e-10, "{:?}", mode);
        }
    }

    #[test]
    fn test_ppd_follows_shear() {
        // Principal direction x sheared toward y.
        let shear = Matrix3::new(1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let result = Reorientation::PreservationOfPrincipalDirection
            .apply(&anisotropic(), &shear)
            .unwrap();

        let (values, vectors) = sorted_eigen(&result);
        assert!((values - Vector3::new(2.0, 0.5, -1.0)).norm() < 1e-10);
        let expected = Vector3::new(1.0, 1.0, 0.0).normalize();
        assert!((vectors.column(0).dot(&expected).abs() - 1.0).abs() < 1e-10);
    }
}
