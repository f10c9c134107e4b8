//! Host-side voxel grids.
//!
//! A [`VoxelGrid`] pairs an [`ImageGeometry`] with one value per voxel. The
//! typed aliases below are the working representation of every kernel.

use crate::error::{DtkError, Result};
use crate::image::ImageGeometry;
use crate::spatial::Vector3;
use crate::tensor::{LogTensor, SpdTensor, DEFAULT_OFF_DIAGONAL_SCALE};

/// Voxel values laid out `x` fastest, then `y`, then `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid<T> {
    geometry: ImageGeometry,
    voxels: Vec<T>,
}

/// Per-voxel 3-vectors in physical units (velocities or displacements).
pub type VectorField = VoxelGrid<Vector3>;

/// Per-voxel SPD tensors; `None` marks background.
pub type TensorField = VoxelGrid<Option<SpdTensor>>;

impl<T> VoxelGrid<T> {
    /// Wrap existing voxel values.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the value count differs from the
    /// geometry's voxel count.
    pub fn new(geometry: ImageGeometry, voxels: Vec<T>) -> Result<Self> {
        if voxels.len() != geometry.num_voxels() {
            return Err(DtkError::ShapeMismatch {
                expected: format!("{} voxels", geometry.num_voxels()),
                actual: format!("{} voxels", voxels.len()),
            });
        }
        Ok(Self { geometry, voxels })
    }

    /// Build a grid by evaluating `f` at every voxel index.
    pub fn from_fn(geometry: ImageGeometry, mut f: impl FnMut([usize; 3]) -> T) -> Self {
        let voxels = (0..geometry.num_voxels())
            .map(|linear| f(geometry.voxel_index(linear)))
            .collect();
        Self { geometry, voxels }
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn voxels(&self) -> &[T] {
        &self.voxels
    }

    pub fn voxels_mut(&mut self) -> &mut [T] {
        &mut self.voxels
    }

    pub fn into_voxels(self) -> Vec<T> {
        self.voxels
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Value at a voxel index.
    ///
    /// # Panics
    /// Panics when the index is outside the grid.
    pub fn get(&self, index: [usize; 3]) -> &T {
        &self.voxels[self.geometry.linear_index(index)]
    }

    /// Apply `f` to every value, keeping the geometry.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> VoxelGrid<U> {
        VoxelGrid {
            geometry: self.geometry.clone(),
            voxels: self.voxels.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> VoxelGrid<T> {
    /// Grid with every voxel set to `value`.
    pub fn filled(geometry: ImageGeometry, value: T) -> Self {
        let voxels = vec![value; geometry.num_voxels()];
        Self { geometry, voxels }
    }
}

impl VoxelGrid<Vector3> {
    /// Largest vector norm expressed in voxel units.
    pub fn max_norm_in_voxels(&self) -> f64 {
        use rayon::prelude::*;
        let geometry = &self.geometry;
        self.voxels
            .par_iter()
            .map(|v| geometry.vector_to_index(v).norm())
            .reduce(|| 0.0, f64::max)
    }
}

/// Log-domain tensor field.
///
/// Carries the off-diagonal scale that was applied when the tensors were
/// logged, so the inverse mapping never has to guess it.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTensorField {
    grid: VoxelGrid<Option<LogTensor>>,
    off_diagonal_scale: f64,
}

impl LogTensorField {
    pub fn new(grid: VoxelGrid<Option<LogTensor>>, off_diagonal_scale: f64) -> Self {
        Self {
            grid,
            off_diagonal_scale,
        }
    }

    /// Field with the default `sqrt(2)` off-diagonal scale.
    pub fn with_default_scale(grid: VoxelGrid<Option<LogTensor>>) -> Self {
        Self::new(grid, DEFAULT_OFF_DIAGONAL_SCALE)
    }

    pub fn grid(&self) -> &VoxelGrid<Option<LogTensor>> {
        &self.grid
    }

    pub fn geometry(&self) -> &ImageGeometry {
        self.grid.geometry()
    }

    pub fn off_diagonal_scale(&self) -> f64 {
        self.off_diagonal_scale
    }

    pub fn into_grid(self) -> VoxelGrid<Option<LogTensor>> {
        self.grid
    }

    /// Number of background voxels.
    pub fn background_count(&self) -> usize {
        self.grid.voxels().iter().filter(|v| v.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Direction3, Point3, Spacing3};

    #[test]
    fn test_grid_shape_mismatch() {
        let geometry = ImageGeometry::with_size([2, 2, 2]).unwrap();
        let result = VoxelGrid::new(geometry, vec![0.0_f64; 7]);
        assert!(matches!(result, Err(DtkError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_from_fn_layout() {
        let geometry = ImageGeometry::with_size([3, 2, 2]).unwrap();
        let grid = VoxelGrid::from_fn(geometry, |[x, y, z]| x + 10 * y + 100 * z);

        assert_eq!(grid.voxels()[1], 1);
        assert_eq!(grid.voxels()[3], 10);
        assert_eq!(grid.voxels()[6], 100);
        assert_eq!(*grid.get([2, 1, 1]), 112);
    }

    #[test]
    fn test_max_norm_in_voxels_uses_spacing() {
        let geometry = ImageGeometry::new(
            [2, 2, 2],
            Point3::origin(),
            Spacing3::repeat(2.0),
            Direction3::identity(),
        )
        .unwrap();
        let mut field = VectorField::filled(geometry, Vector3::zeros());
        field.voxels_mut()[3] = Vector3::new(4.0, 0.0, 0.0);

        assert!((field.max_norm_in_voxels() - 2.0).abs() < 1e-12);
    }
}
