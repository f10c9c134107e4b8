//! Spatial types shared by geometry, transforms and reorientation.
//!
//! All physical-space math is done in `f64` on nalgebra fixed-size types.

use nalgebra::{Matrix3 as NaMatrix3, Point3 as NaPoint3, Vector3 as NaVector3};

pub type Point3 = NaPoint3<f64>;
pub type Vector3 = NaVector3<f64>;
pub type Matrix3 = NaMatrix3<f64>;

/// Physical distance between voxel centres along each index axis.
pub type Spacing3 = Vector3;
/// Direction cosines; column `i` is the physical direction of index axis `i`.
pub type Direction3 = Matrix3;

/// Continuous voxel index `(x, y, z)`.
pub type ContinuousIndex = Point3;
