//! Image geometry, voxel grids and burn-backed vector images.
//!
//! Kernels work on host-side [`VoxelGrid`]s; [`VectorImage`] keeps the
//! payload in a burn tensor for I/O and device interop.

pub mod geometry;
pub mod grid;
pub mod vector_image;

pub use geometry::ImageGeometry;
pub use grid::{LogTensorField, TensorField, VectorField, VoxelGrid};
pub use vector_image::VectorImage;
