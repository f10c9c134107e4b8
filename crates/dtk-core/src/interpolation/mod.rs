//! Interpolation types and operations.
//!
//! Log-tensor interpolators for the resampler, plus the trilinear stencil
//! shared with vector-field sampling.

pub mod linear;
pub mod nearest;
pub mod stencil;
pub mod trait_;

pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use trait_::Interpolator;

use serde::{Deserialize, Serialize};

use crate::image::LogTensorField;
use crate::spatial::ContinuousIndex;
use crate::tensor::LogTensor;

/// Interpolation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
}

impl Interpolator for Interpolation {
    fn interpolate(&self, field: &LogTensorField, index: &ContinuousIndex) -> Option<LogTensor> {
        match self {
            Interpolation::Nearest => NearestNeighborInterpolator.interpolate(field, index),
            Interpolation::Linear => LinearInterpolator.interpolate(field, index),
        }
    }
}
