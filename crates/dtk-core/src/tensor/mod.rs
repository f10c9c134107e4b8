//! Symmetric positive-definite tensors and their log-Euclidean encoding.

pub mod eigen;
pub mod filter;
pub mod spd;

pub use filter::{ExpTensorFilter, LogTensorFilter};
pub use spd::{ClampPolicy, LogOutcome, LogTensor, SpdCodec, SpdTensor, DEFAULT_OFF_DIAGONAL_SCALE};
