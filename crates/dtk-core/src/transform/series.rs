//! Ordered composition of heterogeneous transforms.

use std::fmt;

use crate::error::Result;
use crate::spatial::{Matrix3, Point3};
use crate::transform::{
    AffineTransform, DisplacementFieldTransform, InversionPolicy, SvfTransform, Transform,
    TransformKind,
};

/// One step of a [`TransformSeries`].
#[derive(Debug, Clone)]
pub enum SeriesTransform {
    Linear(AffineTransform),
    Svf(SvfTransform),
    Dense(DisplacementFieldTransform),
}

/// How a step's inverse is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InversionSupport {
    /// Closed form (matrix inverse, negated velocity).
    Exact,
    /// Fixed-point iteration, if the policy permits it.
    Iterative,
}

impl fmt::Display for InversionSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InversionSupport::Exact => write!(f, "exact"),
            InversionSupport::Iterative => write!(f, "iterative"),
        }
    }
}

impl SeriesTransform {
    pub fn kind(&self) -> TransformKind {
        match self {
            SeriesTransform::Linear(_) => TransformKind::Linear,
            SeriesTransform::Svf(_) => TransformKind::Svf,
            SeriesTransform::Dense(_) => TransformKind::Dense,
        }
    }

    pub fn inversion_support(&self) -> InversionSupport {
        match self {
            SeriesTransform::Linear(_) | SeriesTransform::Svf(_) => InversionSupport::Exact,
            SeriesTransform::Dense(_) => InversionSupport::Iterative,
        }
    }

    pub fn inverse(self, policy: &InversionPolicy) -> Result<Self> {
        Ok(match self {
            SeriesTransform::Linear(t) => SeriesTransform::Linear(t.inverse()?),
            SeriesTransform::Svf(t) => SeriesTransform::Svf(t.inverse()?),
            SeriesTransform::Dense(t) => SeriesTransform::Dense(t.inverse(policy)?),
        })
    }
}

impl Transform for SeriesTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        match self {
            SeriesTransform::Linear(t) => t.transform_point(point),
            SeriesTransform::Svf(t) => t.transform_point(point),
            SeriesTransform::Dense(t) => t.transform_point(point),
        }
    }

    fn jacobian(&self, point: &Point3) -> Matrix3 {
        match self {
            SeriesTransform::Linear(t) => t.jacobian(point),
            SeriesTransform::Svf(t) => t.jacobian(point),
            SeriesTransform::Dense(t) => t.jacobian(point),
        }
    }
}

/// Composed mapping from output (fixed) space to input (moving) space.
///
/// Steps are stored in evaluation order: `map_point` applies `steps[0]`
/// first. Built once, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct TransformSeries {
    steps: Vec<SeriesTransform>,
    policy: InversionPolicy,
}

impl TransformSeries {
    /// Empty series, i.e. the identity mapping.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<SeriesTransform>, policy: InversionPolicy) -> Self {
        Self { steps, policy }
    }

    pub fn steps(&self) -> &[SeriesTransform] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Map a fixed-space point into moving space.
    pub fn map_point(&self, point: &Point3) -> Point3 {
        self.steps
            .iter()
            .fold(*point, |p, step| step.transform_point(&p))
    }

    /// Chain-rule Jacobian of [`map_point`](Self::map_point).
    pub fn local_jacobian(&self, point: &Point3) -> Matrix3 {
        self.map_point_with_jacobian(point).1
    }

    pub fn map_point_with_jacobian(&self, point: &Point3) -> (Point3, Matrix3) {
        self.steps
            .iter()
            .fold((*point, Matrix3::identity()), |(p, jacobian), step| {
                let (mapped, local) = step.transform_point_with_jacobian(&p);
                (mapped, local * jacobian)
            })
    }

    /// The inverted composition: steps reversed, each inverted.
    pub fn inverse(self) -> Result<Self> {
        let policy = self.policy;
        let steps = self
            .steps
            .into_iter()
            .rev()
            .map(|step| step.inverse(&policy))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps, policy })
    }

    /// Per-step inversion capability, in evaluation order.
    pub fn inversion_support(&self) -> Vec<(TransformKind, InversionSupport)> {
        self.steps
            .iter()
            .map(|step| (step.kind(), step.inversion_support()))
            .collect()
    }
}

impl Transform for TransformSeries {
    fn transform_point(&self, point: &Point3) -> Point3 {
        self.map_point(point)
    }

    fn jacobian(&self, point: &Point3) -> Matrix3 {
        self.local_jacobian(point)
    }

    fn transform_point_with_jacobian(&self, point: &Point3) -> (Point3, Matrix3) {
        self.map_point_with_jacobian(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Vector3;
    use nalgebra::Rotation3;

    fn scale(factor: f64) -> SeriesTransform {
        SeriesTransform::Linear(AffineTransform::new(
            Matrix3::identity() * factor,
            Vector3::zeros(),
        ))
    }

    fn shift(x: f64) -> SeriesTransform {
        SeriesTransform::Linear(AffineTransform::translation(Vector3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_identity_series() {
        let series = TransformSeries::identity();
        let point = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(series.map_point(&point), point);
        assert_eq!(series.local_jacobian(&point), Matrix3::identity());
    }

    #[test]
    fn test_steps_apply_in_order() {
        let series =
            TransformSeries::from_steps(vec![shift(1.0), scale(2.0)], InversionPolicy::default());
        let mapped = series.map_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((mapped.x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_chain_rule_jacobian() {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3).into_inner();
        let series = TransformSeries::from_steps(
            vec![
                scale(2.0),
                SeriesTransform::Linear(AffineTransform::new(rotation, Vector3::zeros())),
            ],
            InversionPolicy::default(),
        );
        let jacobian = series.local_jacobian(&Point3::origin());
        assert!((jacobian - rotation * 2.0).norm() < 1e-12);
    }

    #[test]
    fn test_inverse_reverses_steps() {
        let series =
            TransformSeries::from_steps(vec![shift(1.0), scale(2.0)], InversionPolicy::default());
        let inverse = series.clone().inverse().unwrap();

        let point = Point3::new(0.3, -1.0, 2.0);
        let back = inverse.map_point(&series.map_point(&point));
        assert!((back - point).norm() < 1e-12);
    }

    #[test]
    fn test_inversion_support_report() {
        let series = TransformSeries::from_steps(vec![shift(1.0)], InversionPolicy::default());
        assert_eq!(
            series.inversion_support(),
            vec![(TransformKind::Linear, InversionSupport::Exact)]
        );
    }
}
