//! Tensor resample filter.
//!
//! Resamples a log-tensor field into an output geometry through a transform
//! that maps output physical space to input physical space, reorienting
//! every sample with the local deformation gradient.

use tracing::{info, warn};

use crate::error::Result;
use crate::filter::Reorientation;
use crate::image::{ImageGeometry, LogTensorField, VoxelGrid};
use crate::interpolation::Interpolator;
use crate::parallel::Parallelism;
use crate::spatial::Point3;
use crate::tensor::LogTensor;
use crate::transform::Transform;

/// Result of resampling one output voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    Reoriented(LogTensor),
    /// Kept as sampled because the Jacobian was singular.
    Unreoriented(LogTensor),
    /// Mapped point fell outside the input buffer.
    OutOfBuffer,
    /// Every contributing input voxel was background.
    Background,
}

impl SampleOutcome {
    pub fn value(&self) -> Option<LogTensor> {
        match self {
            SampleOutcome::Reoriented(t) | SampleOutcome::Unreoriented(t) => Some(*t),
            SampleOutcome::OutOfBuffer | SampleOutcome::Background => None,
        }
    }
}

/// Per-outcome voxel counts of one resampling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResampleReport {
    pub reoriented: usize,
    pub unreoriented: usize,
    pub out_of_buffer: usize,
    pub background: usize,
}

impl ResampleReport {
    fn record(&mut self, outcome: &SampleOutcome) {
        match outcome {
            SampleOutcome::Reoriented(_) => self.reoriented += 1,
            SampleOutcome::Unreoriented(_) => self.unreoriented += 1,
            SampleOutcome::OutOfBuffer => self.out_of_buffer += 1,
            SampleOutcome::Background => self.background += 1,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            reoriented: self.reoriented + other.reoriented,
            unreoriented: self.unreoriented + other.unreoriented,
            out_of_buffer: self.out_of_buffer + other.out_of_buffer,
            background: self.background + other.background,
        }
    }
}

/// Tensor resample filter.
///
/// The transform maps output (fixed) physical space to input (moving)
/// physical space and is borrowed read-only for the whole pass.
///
/// # Type Parameters
/// * `T` - The transform type
/// * `I` - The interpolator type
pub struct TensorResampleFilter<'a, T: Transform + ?Sized, I: Interpolator> {
    geometry: ImageGeometry,
    transform: &'a T,
    interpolator: I,
    reorientation: Reorientation,
    parallelism: Parallelism,
}

impl<'a, T: Transform + ?Sized, I: Interpolator> TensorResampleFilter<'a, T, I> {
    /// Create a new resample filter.
    ///
    /// # Arguments
    /// * `geometry` - Output image geometry
    /// * `transform` - Transform from output space to input space
    /// * `interpolator` - Interpolator for log-tensor sampling
    pub fn new(geometry: ImageGeometry, transform: &'a T, interpolator: I) -> Self {
        Self {
            geometry,
            transform,
            interpolator,
            reorientation: Reorientation::default(),
            parallelism: Parallelism::default(),
        }
    }

    pub fn with_reorientation(mut self, reorientation: Reorientation) -> Self {
        self.reorientation = reorientation;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Resample a single output-space point.
    pub fn resample_point(&self, input: &LogTensorField, point: &Point3) -> SampleOutcome {
        let (moving, jacobian) = self.transform.transform_point_with_jacobian(point);
        let index = input.geometry().physical_to_index(&moving);
        if !input.geometry().is_inside_buffer(&index) {
            return SampleOutcome::OutOfBuffer;
        }
        let Some(sample) = self.interpolator.interpolate(input, &index) else {
            return SampleOutcome::Background;
        };

        let scale = input.off_diagonal_scale();
        let reoriented = jacobian.try_inverse().and_then(|deformation| {
            self.reorientation
                .apply(&sample.to_matrix(scale), &deformation)
        });
        match reoriented {
            Some(matrix) => SampleOutcome::Reoriented(LogTensor::from_matrix(&matrix, scale)),
            None => SampleOutcome::Unreoriented(sample),
        }
    }

    /// Resample `input` into the output geometry.
    pub fn apply(&self, input: &LogTensorField) -> Result<(LogTensorField, ResampleReport)> {
        let geometry = &self.geometry;
        let slab_len = geometry.slab_len();
        let mut output: Vec<Option<LogTensor>> = vec![None; geometry.num_voxels()];

        let reports = self.parallelism.map_slabs(&mut output, slab_len, |slab, chunk| {
            let mut report = ResampleReport::default();
            let start = slab * slab_len;
            for (i, out) in chunk.iter_mut().enumerate() {
                let point = geometry.voxel_center(geometry.voxel_index(start + i));
                let outcome = self.resample_point(input, &point);
                report.record(&outcome);
                *out = outcome.value();
            }
            Ok(report)
        })?;
        let report = reports
            .into_iter()
            .fold(ResampleReport::default(), ResampleReport::merge);

        info!(
            "Resampled {} voxels ({} outside input, {} background)",
            geometry.num_voxels(),
            report.out_of_buffer,
            report.background
        );
        if report.unreoriented > 0 {
            warn!(
                "{} voxel(s) kept unreoriented due to a singular Jacobian",
                report.unreoriented
            );
        }

        let grid = VoxelGrid::new(geometry.clone(), output)?;
        Ok((LogTensorField::new(grid, input.off_diagonal_scale()), report))
    }
}
