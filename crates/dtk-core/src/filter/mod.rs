//! Tensor field filters.

pub mod reorientation;
pub mod resample;

pub use reorientation::Reorientation;
pub use resample::{ResampleReport, SampleOutcome, TensorResampleFilter};
