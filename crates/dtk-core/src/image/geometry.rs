//! Physical-space geometry of a voxel grid.
//!
//! Maps between continuous voxel indices `(x, y, z)` and physical points:
//! `point = origin + Direction * (index * spacing)`.

use crate::error::{DtkError, Result};
use crate::spatial::{ContinuousIndex, Direction3, Matrix3, Point3, Spacing3, Vector3};

/// Geometry of a 3-D image: extent, origin, spacing and direction cosines.
///
/// Voxels are stored with `x` varying fastest, i.e. the linear offset of
/// `[x, y, z]` is `x + nx * (y + ny * z)`, matching a `[Z, Y, X]` tensor layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    size: [usize; 3],
    origin: Point3,
    spacing: Spacing3,
    direction: Direction3,
    index_to_physical: Matrix3,
    physical_to_index: Matrix3,
}

impl ImageGeometry {
    /// Create a new geometry.
    ///
    /// # Errors
    /// Fails when an extent is zero, a spacing is not strictly positive, or
    /// the direction matrix is singular.
    pub fn new(
        size: [usize; 3],
        origin: Point3,
        spacing: Spacing3,
        direction: Direction3,
    ) -> Result<Self> {
        if size.iter().any(|&n| n == 0) {
            return Err(DtkError::geometry(format!("empty extent {:?}", size)));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(DtkError::geometry(format!(
                "spacing must be strictly positive, got {:?}",
                spacing.as_slice()
            )));
        }

        let index_to_physical = direction * Matrix3::from_diagonal(&spacing);
        let physical_to_index = index_to_physical
            .try_inverse()
            .ok_or_else(|| DtkError::geometry("direction matrix is singular"))?;

        Ok(Self {
            size,
            origin,
            spacing,
            direction,
            index_to_physical,
            physical_to_index,
        })
    }

    /// Unit spacing, zero origin and identity direction.
    pub fn with_size(size: [usize; 3]) -> Result<Self> {
        Self::new(size, Point3::origin(), Spacing3::repeat(1.0), Direction3::identity())
    }

    /// Extent `[nx, ny, nz]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing3 {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction3 {
        &self.direction
    }

    /// Tensor layout `[Z, Y, X]` of this geometry.
    pub fn shape_zyx(&self) -> [usize; 3] {
        [self.size[2], self.size[1], self.size[0]]
    }

    pub fn num_voxels(&self) -> usize {
        self.size.iter().product()
    }

    /// Number of voxels in one z-slab.
    pub fn slab_len(&self) -> usize {
        self.size[0] * self.size[1]
    }

    pub fn min_spacing(&self) -> f64 {
        self.spacing.min()
    }

    /// Linear offset of a voxel index.
    pub fn linear_index(&self, index: [usize; 3]) -> usize {
        index[0] + self.size[0] * (index[1] + self.size[1] * index[2])
    }

    /// Voxel index of a linear offset.
    pub fn voxel_index(&self, linear: usize) -> [usize; 3] {
        let slab = self.slab_len();
        let z = linear / slab;
        let rem = linear % slab;
        [rem % self.size[0], rem / self.size[0], z]
    }

    /// Convert a continuous index to a physical point.
    pub fn index_to_physical(&self, index: &ContinuousIndex) -> Point3 {
        self.origin + self.index_to_physical * index.coords
    }

    /// Physical point at the centre of a voxel.
    pub fn voxel_center(&self, index: [usize; 3]) -> Point3 {
        self.index_to_physical(&Point3::new(
            index[0] as f64,
            index[1] as f64,
            index[2] as f64,
        ))
    }

    /// Convert a physical point to a continuous index.
    pub fn physical_to_index(&self, point: &Point3) -> ContinuousIndex {
        Point3::from(self.physical_to_index * (point - self.origin))
    }

    /// Express a physical displacement in voxel units.
    pub fn vector_to_index(&self, vector: &Vector3) -> Vector3 {
        self.physical_to_index * vector
    }

    /// Whether a continuous index falls in the buffer, i.e. in
    /// `[-0.5, n - 0.5)` along every axis.
    pub fn is_inside_buffer(&self, index: &ContinuousIndex) -> bool {
        (0..3).all(|axis| {
            let value = index[axis];
            value >= -0.5 && value < self.size[axis] as f64 - 0.5
        })
    }
}
