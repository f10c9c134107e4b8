//! Physical frame of vector and tensor payloads.
//!
//! Geometry is always taken from the NIfTI header, i.e. RAS. Payload
//! components written by ITK-based tools are expressed in LPS and have to
//! be flipped on `x` and `y` to match.

use std::fmt;
use std::str::FromStr;

use dtk_core::image::{TensorField, VectorField};
use dtk_core::spatial::{Matrix3, Vector3};

/// `diag(-1, -1, 1)`, its own inverse.
pub fn lps_to_ras() -> Matrix3 {
    Matrix3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0))
}

/// Frame in which payload components are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentFrame {
    /// ITK convention.
    #[default]
    Lps,
    /// Same frame as the header geometry.
    Ras,
}

impl FromStr for ComponentFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lps" => Ok(Self::Lps),
            "ras" => Ok(Self::Ras),
            other => Err(format!("unknown component frame '{other}' (expected lps or ras)")),
        }
    }
}

impl fmt::Display for ComponentFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentFrame::Lps => write!(f, "lps"),
            ComponentFrame::Ras => write!(f, "ras"),
        }
    }
}

impl ComponentFrame {
    /// Convert vectors read from disk to the working frame.
    pub fn vectors_to_working(&self, field: &mut VectorField) {
        if *self == ComponentFrame::Lps {
            for v in field.voxels_mut() {
                v.x = -v.x;
                v.y = -v.y;
            }
        }
    }

    /// Convert tensors between disk and working frame; the map is an
    /// involution, so it serves both directions.
    pub fn convert_tensors(&self, field: &mut TensorField) {
        if *self == ComponentFrame::Lps {
            // (xx, xy, yy, xz, yz, zz): only the z-mixed terms change sign.
            for tensor in field.voxels_mut().iter_mut().flatten() {
                tensor.0[3] = -tensor.0[3];
                tensor.0[4] = -tensor.0[4];
            }
        }
    }
}
