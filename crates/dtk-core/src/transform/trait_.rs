//! Transform trait for point mappings with a local Jacobian.

use crate::spatial::{Matrix3, Point3};

/// Spatial mapping between two physical spaces.
///
/// Implementations are immutable once built and shared read-only across
/// resampling threads.
pub trait Transform: Send + Sync {
    /// Map a point.
    fn transform_point(&self, point: &Point3) -> Point3;

    /// Jacobian `d transform_point / d point` at `point`.
    fn jacobian(&self, point: &Point3) -> Matrix3;

    /// Mapped point and Jacobian together.
    fn transform_point_with_jacobian(&self, point: &Point3) -> (Point3, Matrix3) {
        (self.transform_point(point), self.jacobian(point))
    }
}
