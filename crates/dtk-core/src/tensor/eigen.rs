//! Ordered symmetric eigendecomposition helpers.

use crate::spatial::{Matrix3, Vector3};

const MAX_SWEEPS: usize = 32;
const OFF_DIAGONAL_PAIRS: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Eigenvalues in decreasing order and the matching unit eigenvectors as
/// columns.
///
/// Cyclic Jacobi rotations, run until every off-diagonal element is below
/// rounding of its diagonal pair. Eigenvectors stay orthonormal to machine
/// precision even for nearly repeated eigenvalues.
pub fn sorted_eigen(matrix: &Matrix3) -> (Vector3, Matrix3) {
    let (diagonal, basis) = jacobi_eigen(&symmetrize(matrix));
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| diagonal[b].total_cmp(&diagonal[a]));

    let values = Vector3::new(diagonal[order[0]], diagonal[order[1]], diagonal[order[2]]);
    let vectors = Matrix3::from_columns(&[
        basis.column(order[0]).into_owned(),
        basis.column(order[1]).into_owned(),
        basis.column(order[2]).into_owned(),
    ]);
    (values, vectors)
}

fn jacobi_eigen(matrix: &Matrix3) -> (Vector3, Matrix3) {
    let mut a = *matrix;
    let mut basis = Matrix3::identity();

    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;
        for (p, q) in OFF_DIAGONAL_PAIRS {
            let apq = a[(p, q)];
            let negligible = 0.5 * f64::EPSILON * (a[(p, p)].abs() + a[(q, q)].abs());
            if apq.abs() <= negligible {
                a[(p, q)] = 0.0;
                a[(q, p)] = 0.0;
                continue;
            }

            let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
            let t = theta.signum() / (theta.abs() + theta.hypot(1.0));
            let c = 1.0 / t.hypot(1.0);
            let s = t * c;

            let mut rotation = Matrix3::identity();
            rotation[(p, p)] = c;
            rotation[(q, q)] = c;
            rotation[(p, q)] = s;
            rotation[(q, p)] = -s;

            a = rotation.transpose() * a * rotation;
            a[(p, q)] = 0.0;
            a[(q, p)] = 0.0;
            basis *= rotation;
            rotated = true;
        }
        if !rotated {
            break;
        }
    }

    (a.diagonal(), basis)
}

/// `V * diag(values) * V^T`.
pub fn reconstruct(values: &Vector3, vectors: &Matrix3) -> Matrix3 {
    vectors * Matrix3::from_diagonal(values) * vectors.transpose()
}

/// Apply a scalar function to the eigenvalues of a symmetric matrix.
pub fn map_eigenvalues(matrix: &Matrix3, f: impl Fn(f64) -> f64) -> Matrix3 {
    let (values, vectors) = sorted_eigen(matrix);
    reconstruct(&values.map(f), &vectors)
}

pub fn symmetrize(matrix: &Matrix3) -> Matrix3 {
    (matrix + matrix.transpose()) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_descending() {
        let m = Matrix3::from_diagonal(&Vector3::new(1.0, 3.0, 2.0));
        let (values, vectors) = sorted_eigen(&m);

        assert_eq!(values, Vector3::new(3.0, 2.0, 1.0));
        assert!((vectors.column(0).abs() - Vector3::y()).norm() < 1e-12);
        assert!((reconstruct(&values, &vectors) - m).norm() < 1e-12);
    }

    #[test]
    fn test_nearly_repeated_eigenvalues_reconstruct_exactly() {
        let rotation = nalgebra::Rotation3::from_euler_angles(0.0, 0.84149, -1.45378).into_inner();
        let m = rotation * Matrix3::from_diagonal(&Vector3::new(8.53576, 0.01, 8.56939)) * rotation.transpose();
        let (values, vectors) = sorted_eigen(&m);

        assert!((vectors.transpose() * vectors - Matrix3::identity()).norm() < 1e-13);
        assert!((values - Vector3::new(8.56939, 8.53576, 0.01)).norm() < 1e-12);
        assert!((reconstruct(&values, &vectors) - m).norm() / m.norm() < 1e-13);
    }

    #[test]
    fn test_zero_matrix() {
        let (values, vectors) = sorted_eigen(&Matrix3::zeros());
        assert_eq!(values, Vector3::zeros());
        assert_eq!(vectors, Matrix3::identity());
    }
}
