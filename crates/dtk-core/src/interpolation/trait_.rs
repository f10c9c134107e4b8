//! Interpolator trait for sampling log-tensors at continuous indices.

use crate::image::LogTensorField;
use crate::spatial::ContinuousIndex;
use crate::tensor::LogTensor;

/// Samples a log-tensor field at a continuous voxel index.
///
/// Callers check [`ImageGeometry::is_inside_buffer`] first; implementations
/// clamp neighbours to the grid.
///
/// [`ImageGeometry::is_inside_buffer`]: crate::image::ImageGeometry::is_inside_buffer
pub trait Interpolator: Send + Sync {
    /// Interpolated value, or `None` when every contributing voxel is
    /// background.
    fn interpolate(&self, field: &LogTensorField, index: &ContinuousIndex) -> Option<LogTensor>;
}
