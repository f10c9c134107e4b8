//! Trilinear and nearest-neighbour stencils.

use crate::image::ImageGeometry;
use crate::spatial::ContinuousIndex;

/// Eight neighbour offsets and trilinear weights around a continuous index.
///
/// Neighbours outside the grid are clamped to the border voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrilinearStencil {
    pub offsets: [usize; 8],
    pub weights: [f64; 8],
}

impl TrilinearStencil {
    pub fn new(geometry: &ImageGeometry, index: &ContinuousIndex) -> Self {
        let size = geometry.size();
        let mut lower = [0usize; 3];
        let mut upper = [0usize; 3];
        let mut frac = [0.0f64; 3];
        for axis in 0..3 {
            let base = index[axis].floor();
            let last = size[axis] as f64 - 1.0;
            lower[axis] = base.clamp(0.0, last) as usize;
            upper[axis] = (base + 1.0).clamp(0.0, last) as usize;
            frac[axis] = index[axis] - base;
        }

        let mut offsets = [0usize; 8];
        let mut weights = [0.0f64; 8];
        for corner in 0..8 {
            let mut voxel = [0usize; 3];
            let mut weight = 1.0;
            for axis in 0..3 {
                if corner >> axis & 1 == 1 {
                    voxel[axis] = upper[axis];
                    weight *= frac[axis];
                } else {
                    voxel[axis] = lower[axis];
                    weight *= 1.0 - frac[axis];
                }
            }
            offsets[corner] = geometry.linear_index(voxel);
            weights[corner] = weight;
        }
        Self { offsets, weights }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.offsets.iter().copied().zip(self.weights.iter().copied())
    }
}

/// Linear offset of the voxel nearest to a continuous index, clamped.
pub fn nearest_offset(geometry: &ImageGeometry, index: &ContinuousIndex) -> usize {
    let size = geometry.size();
    let mut voxel = [0usize; 3];
    for axis in 0..3 {
        voxel[axis] = index[axis].round().clamp(0.0, size[axis] as f64 - 1.0) as usize;
    }
    geometry.linear_index(voxel)
}
