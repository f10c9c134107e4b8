//! Log-Euclidean resampling of diffusion tensor fields.
//!
//! `dtk-core` composes heterogeneous spatial transforms (linear, stationary
//! velocity fields, dense displacement fields) into a single mapping and
//! resamples SPD tensor fields through it with anisotropic reorientation.

pub mod error;
pub mod spatial;
pub mod image;
pub mod tensor;
pub mod interpolation;
pub mod transform;
pub mod filter;
pub mod parallel;
pub mod pipeline;

pub use error::{DtkError, Result};
pub use image::{ImageGeometry, LogTensorField, TensorField, VectorField, VectorImage, VoxelGrid};
pub use parallel::Parallelism;
