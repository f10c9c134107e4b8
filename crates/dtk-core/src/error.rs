//! Error types for tensor resampling operations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dtk operations.
#[derive(Error, Debug)]
pub enum DtkError {
    /// A tensor is outside the SPD domain and the caller asked to reject it.
    #[error("Non positive definite tensor: smallest eigenvalue {min_eigenvalue:e}")]
    NonPositiveDefiniteInput {
        min_eigenvalue: f64,
    },

    /// The transform series descriptor could not be parsed.
    #[error("Malformed transform series descriptor: {0}")]
    MalformedSeriesDescriptor(String),

    /// An entry has to be inverted but no inversion is available for it.
    #[error("Unsupported inversion: {0}")]
    UnsupportedInversion(String),

    /// Only orders 0 and 1 are defined.
    #[error("Unsupported velocity field exponentiation order {0} (supported: 0, 1)")]
    UnsupportedExponentiationOrder(u32),

    /// A transform payload could not be loaded.
    #[error("Failed to load transform from {path}: {reason}")]
    TransformLoad {
        path: PathBuf,
        reason: String,
    },

    /// Invalid image geometry.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for dtk operations.
pub type Result<T> = std::result::Result<T, DtkError>;

impl DtkError {
    /// Create a malformed descriptor error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSeriesDescriptor(msg.into())
    }

    /// Create an unsupported inversion error.
    pub fn unsupported_inversion(msg: impl Into<String>) -> Self {
        Self::UnsupportedInversion(msg.into())
    }

    /// Create an invalid geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a transform loading error.
    pub fn transform_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TransformLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
