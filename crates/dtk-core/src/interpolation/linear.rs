//! Trilinear interpolation.

use crate::image::{LogTensorField, VectorField};
use crate::interpolation::stencil::TrilinearStencil;
use crate::interpolation::Interpolator;
use crate::spatial::{ContinuousIndex, Point3, Vector3};
use crate::tensor::LogTensor;

/// Trilinear interpolator over log-tensors.
///
/// Background neighbours are dropped and the remaining weights
/// renormalized, so tensors near a mask border are not pulled toward zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    pub fn new() -> Self {
        Self
    }

    /// Sample a vector field at a physical point.
    ///
    /// Points outside the buffer yield a zero vector.
    pub fn sample_vector(field: &VectorField, point: &Point3) -> Vector3 {
        let geometry = field.geometry();
        let index = geometry.physical_to_index(point);
        if !geometry.is_inside_buffer(&index) {
            return Vector3::zeros();
        }
        let voxels = field.voxels();
        TrilinearStencil::new(geometry, &index)
            .iter()
            .fold(Vector3::zeros(), |acc, (offset, weight)| acc + voxels[offset] * weight)
    }
}

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, field: &LogTensorField, index: &ContinuousIndex) -> Option<LogTensor> {
        let voxels = field.grid().voxels();
        let mut value = LogTensor::zeros();
        let mut total = 0.0;
        for (offset, weight) in TrilinearStencil::new(field.geometry(), index).iter() {
            if weight == 0.0 {
                continue;
            }
            if let Some(tensor) = &voxels[offset] {
                value.add_scaled(tensor, weight);
                total += weight;
            }
        }

        if total <= 0.0 {
            return None;
        }
        value.scale(1.0 / total);
        Some(value)
    }
}
