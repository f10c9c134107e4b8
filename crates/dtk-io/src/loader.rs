//! File-backed transform loading.

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use dtk_core::image::VectorField;
use dtk_core::transform::{AffineTransform, SeriesDescriptor, TransformLoader};
use std::path::Path;
use tracing::debug;

use crate::frame::ComponentFrame;
use crate::itk_transform::read_itk_transform;
use crate::nifti_io::read_vector_image;

/// Read a transform series descriptor; relative entries resolve against
/// the descriptor's directory.
pub fn read_series_descriptor<P: AsRef<Path>>(path: P) -> Result<SeriesDescriptor> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transform series {}", path.display()))?;
    let base_dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    Ok(SeriesDescriptor::from_xml_str(&text, base_dir)?)
}

/// Loads linear transforms from ITK text files and vector fields from
/// NIfTI images through the backend `B`.
#[derive(Debug, Clone)]
pub struct FileTransformLoader<B: Backend> {
    device: B::Device,
    frame: ComponentFrame,
}

impl<B: Backend> FileTransformLoader<B> {
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
            frame: ComponentFrame::default(),
        }
    }

    pub fn with_frame(mut self, frame: ComponentFrame) -> Self {
        self.frame = frame;
        self
    }

    fn read_field(&self, path: &Path) -> Result<VectorField> {
        let image = read_vector_image::<B, _>(path, &self.device)?;
        let mut field = VectorField::from_image(&image)?;
        self.frame.vectors_to_working(&mut field);
        debug!("Read vector field {} with size {:?}", path.display(), field.geometry().size());
        Ok(field)
    }
}

impl<B: Backend> TransformLoader for FileTransformLoader<B> {
    fn load_linear(&self, path: &Path) -> dtk_core::Result<AffineTransform> {
        read_itk_transform(path).map_err(|e| dtk_core::DtkError::transform_load(path, format!("{e:#}")))
    }

    fn load_vector_field(&self, path: &Path) -> dtk_core::Result<VectorField> {
        self.read_field(path)
            .map_err(|e| dtk_core::DtkError::transform_load(path, format!("{e:#}")))
    }
}
