//! Builds a [`TransformSeries`] from a [`SeriesDescriptor`].
//!
//! Entries are listed moving to fixed. Resampling walks the chain the other
//! way, so entry `i` contributes its inverse `r_i`, and the evaluation order
//! is `r_n, ..., r_1`. Global inversion swaps the roles of the two spaces:
//! each entry's inversion flag is flipped and the evaluation order becomes
//! `r_1^-1, ..., r_n^-1`.

use std::path::Path;

use tracing::info;

use crate::error::{DtkError, Result};
use crate::image::VectorField;
use crate::parallel::Parallelism;
use crate::transform::{
    AffineTransform, DisplacementFieldTransform, ExponentiationConfig, ExponentiationOrder,
    InversionPolicy, SeriesDescriptor, SeriesTransform, SvfTransform, TransformKind,
    TransformSeries,
};

/// Source of transform payloads.
pub trait TransformLoader {
    /// Load a linear transform, already expressed in the working frame.
    fn load_linear(&self, path: &Path) -> Result<AffineTransform>;

    /// Load a velocity or displacement field.
    fn load_vector_field(&self, path: &Path) -> Result<VectorField>;
}

/// Settings for [`compose_series`].
///
/// `invert_series` and `exponentiation_order` override the descriptor's own
/// series-level values when set.
#[derive(Debug, Clone, Default)]
pub struct CompositionConfig {
    pub invert_series: bool,
    pub exponentiation_order: Option<u32>,
    pub exponentiation: ExponentiationConfig,
    pub inversion: InversionPolicy,
    pub parallelism: Parallelism,
}

impl CompositionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invert_series(mut self, invert: bool) -> Self {
        self.invert_series = invert;
        self
    }

    pub fn with_exponentiation_order(mut self, order: u32) -> Self {
        self.exponentiation_order = Some(order);
        self
    }

    pub fn with_exponentiation(mut self, config: ExponentiationConfig) -> Self {
        self.exponentiation = config;
        self
    }

    pub fn with_inversion_policy(mut self, policy: InversionPolicy) -> Self {
        self.inversion = policy;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }
}

/// Compose the series described by `descriptor`.
///
/// The descriptor is fully validated before any payload is loaded.
///
/// # Errors
/// `UnsupportedExponentiationOrder` for orders above 1,
/// `UnsupportedInversion` for dense entries that must be inverted when the
/// policy forbids iterative inversion, and any loader error.
pub fn compose_series<L: TransformLoader + ?Sized>(
    descriptor: &SeriesDescriptor,
    loader: &L,
    config: &CompositionConfig,
) -> Result<TransformSeries> {
    let invert_series = config.invert_series || descriptor.invert_series.unwrap_or(false);
    let order = ExponentiationOrder::try_from(
        config
            .exponentiation_order
            .or(descriptor.exponentiation_order)
            .unwrap_or(0),
    )?;

    // Effective inversion of each entry's resampling map.
    let plan: Vec<(usize, bool)> = descriptor
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (i, entry.invert ^ invert_series))
        .collect();

    for &(i, invert) in &plan {
        let entry = &descriptor.entries[i];
        if entry.kind == TransformKind::Dense && invert && !config.inversion.allow_iterative {
            return Err(DtkError::unsupported_inversion(format!(
                "entry {} ({}) needs inversion but iterative inversion is disabled",
                i + 1,
                entry.path.display()
            )));
        }
    }

    let total = plan.len();
    let mut steps = Vec::with_capacity(total);
    for &(i, invert) in &plan {
        let entry = &descriptor.entries[i];
        info!(
            "Loading {} transform {}/{} from {} (inverted: {})",
            entry.kind,
            i + 1,
            total,
            entry.path.display(),
            invert
        );
        let step = match entry.kind {
            TransformKind::Linear => {
                let transform = loader.load_linear(&entry.path)?;
                SeriesTransform::Linear(if invert { transform.inverse()? } else { transform })
            }
            TransformKind::Svf => {
                let velocity = loader.load_vector_field(&entry.path)?;
                SeriesTransform::Svf(SvfTransform::build(
                    velocity,
                    invert,
                    order,
                    config.exponentiation,
                    config.parallelism,
                )?)
            }
            TransformKind::Dense => {
                let transform = DisplacementFieldTransform::new(loader.load_vector_field(&entry.path)?);
                SeriesTransform::Dense(if invert {
                    transform.inverse(&config.inversion)?
                } else {
                    transform
                })
            }
        };
        steps.push(step);
    }

    if !invert_series {
        steps.reverse();
    }
    Ok(TransformSeries::from_steps(steps, config.inversion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Matrix3, Point3, Vector3};
    use crate::transform::TransformDescriptor;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[derive(Default)]
    struct MemoryLoader {
        linear: HashMap<PathBuf, AffineTransform>,
        fields: HashMap<PathBuf, VectorField>,
    }

    impl TransformLoader for MemoryLoader {
        fn load_linear(&self, path: &Path) -> Result<AffineTransform> {
            self.linear
                .get(path)
                .cloned()
                .ok_or_else(|| DtkError::transform_load(path, "not found"))
        }

        fn load_vector_field(&self, path: &Path) -> Result<VectorField> {
            self.fields
                .get(path)
                .cloned()
                .ok_or_else(|| DtkError::transform_load(path, "not found"))
        }
    }

    fn loader() -> MemoryLoader {
        let mut loader = MemoryLoader::default();
        loader.linear.insert(
            PathBuf::from("shift"),
            AffineTransform::translation(Vector3::new(1.0, 0.0, 0.0)),
        );
        loader.linear.insert(
            PathBuf::from("scale"),
            AffineTransform::new(Matrix3::identity() * 2.0, Vector3::zeros()),
        );
        loader
    }

    fn series(entries: &[(&str, bool)]) -> SeriesDescriptor {
        SeriesDescriptor::new(
            entries
                .iter()
                .map(|(path, invert)| TransformDescriptor::new(TransformKind::Linear, *path, *invert))
                .collect(),
        )
    }

    #[test]
    fn test_entries_applied_in_reverse_for_resampling() {
        // Stored maps r_i are used as given: r_2 = scale runs first.
        let descriptor = series(&[("shift", false), ("scale", false)]);
        let composed = compose_series(&descriptor, &loader(), &CompositionConfig::default()).unwrap();

        let mapped = composed.map_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((mapped.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_global_inversion_inverts_composition() {
        let descriptor = series(&[("shift", false), ("scale", true)]);
        let forward = compose_series(&descriptor, &loader(), &CompositionConfig::default()).unwrap();
        let inverted = compose_series(
            &descriptor,
            &loader(),
            &CompositionConfig::default().with_invert_series(true),
        )
        .unwrap();

        let point = Point3::new(0.7, -2.0, 4.0);
        let back = inverted.map_point(&forward.map_point(&point));
        assert!((back - point).norm() < 1e-12);
    }

    #[test]
    fn test_descriptor_invert_series_is_honoured() {
        let mut descriptor = series(&[("shift", false)]);
        descriptor.invert_series = Some(true);
        let composed = compose_series(&descriptor, &loader(), &CompositionConfig::default()).unwrap();

        let mapped = composed.map_point(&Point3::origin());
        assert!((mapped.x + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unsupported_order_rejected_before_loading() {
        let descriptor = series(&[("missing", false)]);
        let result = compose_series(
            &descriptor,
            &loader(),
            &CompositionConfig::default().with_exponentiation_order(2),
        );
        assert!(matches!(
            result,
            Err(DtkError::UnsupportedExponentiationOrder(2))
        ));
    }

    #[test]
    fn test_dense_inversion_disabled_fails_fast() {
        let descriptor = SeriesDescriptor::new(vec![
            TransformDescriptor::new(TransformKind::Linear, "missing", false),
            TransformDescriptor::new(TransformKind::Dense, "field", true),
        ]);
        let config = CompositionConfig::default()
            .with_inversion_policy(InversionPolicy::default().with_iterative(false));

        let result = compose_series(&descriptor, &loader(), &config);
        assert!(matches!(result, Err(DtkError::UnsupportedInversion(_))));
    }

    #[test]
    fn test_loader_error_propagates() {
        let descriptor = series(&[("missing", false)]);
        let result = compose_series(&descriptor, &loader(), &CompositionConfig::default());
        assert!(matches!(result, Err(DtkError::TransformLoad { .. })));
    }

    #[test]
    fn test_inverted_svf_entry_is_negated() {
        let mut loader = loader();
        let geometry = crate::image::ImageGeometry::with_size([6, 6, 6]).unwrap();
        loader
            .fields
            .insert(PathBuf::from("svf"), VectorField::filled(geometry, Vector3::new(0.3, 0.0, 0.0)));
        let descriptor = SeriesDescriptor::new(vec![TransformDescriptor::new(TransformKind::Svf, "svf", true)]);

        let composed = compose_series(&descriptor, &loader, &CompositionConfig::default()).unwrap();
        match &composed.steps()[0] {
            SeriesTransform::Svf(svf) => {
                assert!(svf.is_negated());
                assert!((svf.displacement().get([3, 3, 3]).x + 0.3).abs() < 1e-12);
            }
            other => panic!("expected an svf step, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_empty_series_is_identity() {
        let composed = compose_series(
            &SeriesDescriptor::default(),
            &loader(),
            &CompositionConfig::default(),
        )
        .unwrap();
        assert!(composed.is_empty());
    }
}
