//! Log, resample and exp in one call.

use tracing::info;

use crate::error::Result;
use crate::filter::{Reorientation, ResampleReport, TensorResampleFilter};
use crate::image::{ImageGeometry, TensorField};
use crate::interpolation::Interpolation;
use crate::parallel::Parallelism;
use crate::tensor::{ExpTensorFilter, LogTensorFilter, SpdCodec};
use crate::transform::Transform;

/// Options for [`apply_transform`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub codec: SpdCodec,
    pub reorientation: Reorientation,
    pub interpolation: Interpolation,
    pub parallelism: Parallelism,
}

impl PipelineOptions {
    pub fn with_codec(mut self, codec: SpdCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_reorientation(mut self, reorientation: Reorientation) -> Self {
        self.reorientation = reorientation;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }
}

/// Resample an SPD tensor field into `geometry` through `transform`.
///
/// `transform` maps output physical points to input physical points.
pub fn apply_transform<T: Transform + ?Sized>(
    input: &TensorField,
    geometry: &ImageGeometry,
    transform: &T,
    options: &PipelineOptions,
) -> Result<(TensorField, ResampleReport)> {
    info!("Logging input...");
    let logged = LogTensorFilter::new(options.codec)
        .with_parallelism(options.parallelism)
        .apply(input)?;

    info!("Applying transform...");
    let (resampled, report) = TensorResampleFilter::new(geometry.clone(), transform, options.interpolation)
        .with_reorientation(options.reorientation)
        .with_parallelism(options.parallelism)
        .apply(&logged)?;

    info!("Exping output...");
    let output = ExpTensorFilter::new()
        .with_parallelism(options.parallelism)
        .apply(&resampled)?;

    Ok((output, report))
}
