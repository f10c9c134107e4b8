//! Stationary velocity field exponentiation.
//!
//! `phi = exp(v)` by scaling and squaring:
//! 1. Scale the velocity by `1 / 2^K`.
//! 2. For order 1, replace the scaled step `h` by `h(x + h(x) / 2)`.
//! 3. Compose `u <- u + u o (x + u)` `K` times.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DtkError, Result};
use crate::image::{VectorField, VoxelGrid};
use crate::interpolation::LinearInterpolator;
use crate::parallel::Parallelism;
use crate::spatial::{Matrix3, Point3, Vector3};
use crate::transform::{DisplacementFieldTransform, Transform};

/// Accuracy of the initial scaled step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExponentiationOrder {
    /// `u0 = h`.
    #[default]
    Direct,
    /// Midpoint step `u0(x) = h(x + h(x) / 2)`.
    Refined,
}

impl TryFrom<u32> for ExponentiationOrder {
    type Error = DtkError;

    fn try_from(order: u32) -> Result<Self> {
        match order {
            0 => Ok(Self::Direct),
            1 => Ok(Self::Refined),
            other => Err(DtkError::UnsupportedExponentiationOrder(other)),
        }
    }
}

/// Scaling-and-squaring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentiationConfig {
    pub max_squarings: u32,
    /// Largest displacement of the scaled step, in voxels.
    pub max_initial_displacement: f64,
    /// Force this many squarings.
    pub fixed_squarings: Option<u32>,
}

impl Default for ExponentiationConfig {
    fn default() -> Self {
        Self {
            max_squarings: 20,
            max_initial_displacement: 0.5,
            fixed_squarings: None,
        }
    }
}

impl ExponentiationConfig {
    pub fn with_max_squarings(mut self, max_squarings: u32) -> Self {
        self.max_squarings = max_squarings;
        self
    }

    pub fn with_max_initial_displacement(mut self, voxels: f64) -> Self {
        self.max_initial_displacement = voxels;
        self
    }

    pub fn with_fixed_squarings(mut self, squarings: u32) -> Self {
        self.fixed_squarings = Some(squarings);
        self
    }

    /// Number of squarings for a field whose largest norm is `max_norm`
    /// voxels.
    pub fn squarings_for(&self, max_norm: f64) -> u32 {
        if let Some(fixed) = self.fixed_squarings {
            return fixed;
        }
        if max_norm <= 0.0 || !max_norm.is_finite() {
            return 0;
        }
        let ratio = max_norm / self.max_initial_displacement;
        let needed = ratio.log2().ceil().max(0.0) as u32;
        needed.min(self.max_squarings)
    }
}

/// Exponentiate a velocity field into a displacement field.
pub fn exponentiate(
    velocity: &VectorField,
    order: ExponentiationOrder,
    config: &ExponentiationConfig,
    parallelism: Parallelism,
) -> Result<VectorField> {
    let squarings = config.squarings_for(parallelism.install(|| velocity.max_norm_in_voxels())?);
    let scale = 0.5f64.powi(squarings as i32);
    debug!("Exponentiating velocity field with {} squarings", squarings);

    let step = velocity.map(|v| v * scale);
    let mut current = match order {
        ExponentiationOrder::Direct => step,
        ExponentiationOrder::Refined => midpoint_step(&step, parallelism)?,
    };

    let mut next = current.clone();
    for _ in 0..squarings {
        compose_with_self(&current, &mut next, parallelism)?;
        std::mem::swap(&mut current, &mut next);
    }
    Ok(current)
}

fn midpoint_step(step: &VectorField, parallelism: Parallelism) -> Result<VectorField> {
    let mut output = step.clone();
    let geometry = step.geometry();
    let slab_len = geometry.slab_len();
    parallelism.map_slabs(output.voxels_mut(), slab_len, |slab, chunk| {
        let start = slab * slab_len;
        for (i, out) in chunk.iter_mut().enumerate() {
            let linear = start + i;
            let point = geometry.voxel_center(geometry.voxel_index(linear));
            let half = step.voxels()[linear] * 0.5;
            *out = LinearInterpolator::sample_vector(step, &(point + half));
        }
        Ok(())
    })?;
    Ok(output)
}

/// `next(x) = u(x) + u(x + u(x))`.
fn compose_with_self(
    current: &VectorField,
    next: &mut VoxelGrid<Vector3>,
    parallelism: Parallelism,
) -> Result<()> {
    let geometry = current.geometry();
    let slab_len = geometry.slab_len();
    parallelism.map_slabs(next.voxels_mut(), slab_len, |slab, chunk| {
        let start = slab * slab_len;
        for (i, out) in chunk.iter_mut().enumerate() {
            let linear = start + i;
            let point = geometry.voxel_center(geometry.voxel_index(linear));
            let u = current.voxels()[linear];
            *out = u + LinearInterpolator::sample_vector(current, &(point + u));
        }
        Ok(())
    })?;
    Ok(())
}

/// Diffeomorphism given by a stationary velocity field.
///
/// The displacement is computed once on construction; the inverse
/// re-exponentiates the negated velocity.
#[derive(Debug, Clone)]
pub struct SvfTransform {
    velocity: VectorField,
    negated: bool,
    order: ExponentiationOrder,
    config: ExponentiationConfig,
    parallelism: Parallelism,
    flow: DisplacementFieldTransform,
}

impl SvfTransform {
    pub fn new(
        velocity: VectorField,
        order: ExponentiationOrder,
        config: ExponentiationConfig,
        parallelism: Parallelism,
    ) -> Result<Self> {
        Self::build(velocity, false, order, config, parallelism)
    }

    /// `exp(v)`, or `exp(-v)` when `negated`, exponentiated once.
    pub fn build(
        velocity: VectorField,
        negated: bool,
        order: ExponentiationOrder,
        config: ExponentiationConfig,
        parallelism: Parallelism,
    ) -> Result<Self> {
        let displacement = if negated {
            exponentiate(&velocity.map(|v| -v), order, &config, parallelism)?
        } else {
            exponentiate(&velocity, order, &config, parallelism)?
        };
        Ok(Self {
            velocity,
            negated,
            order,
            config,
            parallelism,
            flow: DisplacementFieldTransform::new(displacement),
        })
    }

    /// Exact inverse `exp(-v)`.
    pub fn inverse(self) -> Result<Self> {
        Self::build(
            self.velocity,
            !self.negated,
            self.order,
            self.config,
            self.parallelism,
        )
    }

    pub fn velocity(&self) -> &VectorField {
        &self.velocity
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn displacement(&self) -> &VectorField {
        self.flow.field()
    }
}

impl Transform for SvfTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        self.flow.transform_point(point)
    }

    fn jacobian(&self, point: &Point3) -> Matrix3 {
        self.flow.jacobian(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageGeometry;

    fn constant_field(value: Vector3) -> VectorField {
        VectorField::filled(ImageGeometry::with_size([8, 8, 8]).unwrap(), value)
    }

    #[test]
    fn test_order_conversion() {
        assert_eq!(ExponentiationOrder::try_from(0).unwrap(), ExponentiationOrder::Direct);
        assert_eq!(ExponentiationOrder::try_from(1).unwrap(), ExponentiationOrder::Refined);
        assert!(matches!(
            ExponentiationOrder::try_from(2),
            Err(DtkError::UnsupportedExponentiationOrder(2))
        ));
    }

    #[test]
    fn test_squarings_for() {
        let config = ExponentiationConfig::default();
        assert_eq!(config.squarings_for(0.0), 0);
        assert_eq!(config.squarings_for(0.4), 0);
        assert_eq!(config.squarings_for(1.0), 1);
        assert_eq!(config.squarings_for(3.0), 3);
        assert_eq!(config.with_max_squarings(2).squarings_for(100.0), 2);
        assert_eq!(config.with_fixed_squarings(5).squarings_for(0.0), 5);
    }

    #[test]
    fn test_zero_velocity_is_identity() {
        let field = constant_field(Vector3::zeros());
        let displacement = exponentiate(
            &field,
            ExponentiationOrder::Direct,
            &ExponentiationConfig::default(),
            Parallelism::default(),
        )
        .unwrap();
        assert!(displacement.voxels().iter().all(|v| *v == Vector3::zeros()));
    }

    #[test]
    fn test_constant_velocity_is_translation_at_center() {
        let field = constant_field(Vector3::new(0.75, 0.0, 0.0));
        let displacement = exponentiate(
            &field,
            ExponentiationOrder::Direct,
            &ExponentiationConfig::default(),
            Parallelism::with_threads(2),
        )
        .unwrap();

        // Interior voxels only; near the border the zero padding leaks in.
        let value = displacement.get([2, 4, 4]);
        assert!((value - Vector3::new(0.75, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_svf_inverse_undoes_forward() {
        let geometry = ImageGeometry::with_size([16, 16, 16]).unwrap();
        let velocity = VectorField::from_fn(geometry, |[x, y, _]| {
            let (x, y) = (x as f64 - 7.5, y as f64 - 7.5);
            Vector3::new(-0.02 * y, 0.02 * x, 0.0)
        });
        let forward = SvfTransform::new(
            velocity,
            ExponentiationOrder::Refined,
            ExponentiationConfig::default(),
            Parallelism::default(),
        )
        .unwrap();
        let inverse = forward.clone().inverse().unwrap();
        assert!(inverse.is_negated());

        let point = Point3::new(8.0, 6.0, 7.0);
        let back = inverse.transform_point(&forward.transform_point(&point));
        assert!((back - point).norm() < 1e-2);

        let restored = inverse.inverse().unwrap();
        assert!(!restored.is_negated());
        assert_eq!(restored.displacement(), forward.displacement());
    }

    #[test]
    fn test_build_negated_matches_inverse() {
        let geometry = ImageGeometry::with_size([8, 8, 8]).unwrap();
        let velocity = VectorField::from_fn(geometry, |[x, _, z]| {
            Vector3::new(0.05 * z as f64, 0.0, -0.03 * x as f64)
        });
        let config = ExponentiationConfig::default();
        let negated = SvfTransform::build(
            velocity.clone(),
            true,
            ExponentiationOrder::Direct,
            config,
            Parallelism::default(),
        )
        .unwrap();
        let expected = exponentiate(
            &velocity.map(|v| -v),
            ExponentiationOrder::Direct,
            &config,
            Parallelism::default(),
        )
        .unwrap();

        assert!(negated.is_negated());
        assert_eq!(negated.displacement(), &expected);
        assert_eq!(negated.velocity(), &velocity);
    }

    #[test]
    fn test_refined_order_is_second_order_start() {
        // v(x) = a x: direct gives a x, the midpoint start a x (1 + a / 2).
        let geometry = ImageGeometry::with_size([16, 4, 4]).unwrap();
        let velocity = VectorField::from_fn(geometry, |[x, _, _]| Vector3::new(0.1 * x as f64, 0.0, 0.0));
        let config = ExponentiationConfig::default().with_fixed_squarings(0);

        let direct =
            exponentiate(&velocity, ExponentiationOrder::Direct, &config, Parallelism::default()).unwrap();
        let refined =
            exponentiate(&velocity, ExponentiationOrder::Refined, &config, Parallelism::default()).unwrap();

        let exact = 4.0 * (0.1f64.exp() - 1.0);
        let refined_x = refined.get([4, 1, 1]).x;
        assert!((refined_x - 0.42).abs() < 1e-12);
        assert!((refined_x - exact).abs() < (direct.get([4, 1, 1]).x - exact).abs());
    }
}
