//! Spatial transforms and their composition into a series.

pub mod affine;
pub mod composer;
pub mod descriptor;
pub mod displacement_field;
pub mod series;
pub mod trait_;
pub mod velocity;

pub use affine::AffineTransform;
pub use composer::{compose_series, CompositionConfig, TransformLoader};
pub use descriptor::{SeriesDescriptor, TransformDescriptor, TransformKind};
pub use displacement_field::{DisplacementFieldTransform, InversionPolicy};
pub use series::{InversionSupport, SeriesTransform, TransformSeries};
pub use trait_::Transform;
pub use velocity::{exponentiate, ExponentiationConfig, ExponentiationOrder, SvfTransform};
