//! Nearest-neighbour interpolation.

use crate::image::LogTensorField;
use crate::interpolation::stencil::nearest_offset;
use crate::interpolation::Interpolator;
use crate::spatial::ContinuousIndex;
use crate::tensor::LogTensor;

#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl Interpolator for NearestNeighborInterpolator {
    fn interpolate(&self, field: &LogTensorField, index: &ContinuousIndex) -> Option<LogTensor> {
        field.grid().voxels()[nearest_offset(field.geometry(), index)]
    }
}
