//! Voxel-wise log/exp filters over tensor fields.

use tracing::{debug, warn};

use crate::error::{DtkError, Result};
use crate::image::{LogTensorField, TensorField, VoxelGrid};
use crate::parallel::Parallelism;
use crate::tensor::{ClampPolicy, LogTensor, SpdCodec, SpdTensor};

#[derive(Debug, Default, Clone, Copy)]
struct LogStats {
    clamped: usize,
    invalid: usize,
}

/// Maps an SPD tensor field to the log domain.
///
/// Background voxels stay background. Under [`ClampPolicy::Clamp`],
/// non-finite voxels are turned into background and counted; under
/// [`ClampPolicy::Reject`] the first non-SPD voxel aborts the filter.
#[derive(Debug, Clone, Default)]
pub struct LogTensorFilter {
    codec: SpdCodec,
    parallelism: Parallelism,
}

impl LogTensorFilter {
    pub fn new(codec: SpdCodec) -> Self {
        Self {
            codec,
            parallelism: Parallelism::default(),
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn apply(&self, input: &TensorField) -> Result<LogTensorField> {
        let geometry = input.geometry();
        let slab_len = geometry.slab_len();
        let source = input.voxels();
        let mut output: Vec<Option<LogTensor>> = vec![None; source.len()];
        let codec = &self.codec;

        let stats = self.parallelism.map_slabs(&mut output, slab_len, |slab, chunk| {
            let mut stats = LogStats::default();
            let start = slab * slab_len;
            let end = start + chunk.len();
            for (out, tensor) in chunk.iter_mut().zip(&source[start..end]) {
                let Some(tensor) = tensor else { continue };
                match codec.log(tensor) {
                    Ok(outcome) => {
                        stats.clamped += usize::from(outcome.clamped);
                        *out = Some(outcome.tensor);
                    }
                    Err(e) if codec.policy() == ClampPolicy::Reject => return Err(e),
                    Err(DtkError::NonPositiveDefiniteInput { .. }) => stats.invalid += 1,
                    Err(e) => return Err(e),
                }
            }
            Ok(stats)
        })?;

        let total = stats.iter().fold(LogStats::default(), |acc, s| LogStats {
            clamped: acc.clamped + s.clamped,
            invalid: acc.invalid + s.invalid,
        });
        if total.clamped > 0 {
            warn!(
                "Clamped {} tensor(s) with eigenvalues below {:e}",
                total.clamped,
                codec.eigenvalue_floor()
            );
        }
        if total.invalid > 0 {
            warn!("Replaced {} non-finite tensor(s) with background", total.invalid);
        }
        debug!("Logged {} voxels", source.len());

        let grid = VoxelGrid::new(geometry.clone(), output)?;
        Ok(LogTensorField::new(grid, codec.off_diagonal_scale()))
    }
}

/// Maps a log-tensor field back to SPD tensors.
///
/// Uses the off-diagonal scale recorded on the field.
#[derive(Debug, Clone, Default)]
pub struct ExpTensorFilter {
    parallelism: Parallelism,
}

impl ExpTensorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn apply(&self, input: &LogTensorField) -> Result<TensorField> {
        let geometry = input.geometry();
        let slab_len = geometry.slab_len();
        let source = input.grid().voxels();
        let codec = SpdCodec::default().with_off_diagonal_scale(input.off_diagonal_scale());
        let mut output: Vec<Option<SpdTensor>> = vec![None; source.len()];

        self.parallelism.map_slabs(&mut output, slab_len, |slab, chunk| {
            let start = slab * slab_len;
            let end = start + chunk.len();
            for (out, log) in chunk.iter_mut().zip(&source[start..end]) {
                *out = log.map(|l| codec.exp(&l));
            }
            Ok(())
        })?;

        VoxelGrid::new(geometry.clone(), output)
    }
}
