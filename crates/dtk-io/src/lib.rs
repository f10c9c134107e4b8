//! File formats for dtk: NIfTI vector images, ITK text transforms and
//! transform series descriptors.

pub mod frame;
pub mod itk_transform;
pub mod loader;
pub mod nifti_io;

pub use frame::ComponentFrame;
pub use itk_transform::read_itk_transform;
pub use loader::{read_series_descriptor, FileTransformLoader};
pub use nifti_io::{read_geometry, read_vector_image, write_vector_image};
