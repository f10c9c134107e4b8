//! ITK text transform files.
//!
//! ```text
//! #Insight Transform File V1.0
//! #Transform 0
//! Transform: AffineTransform_double_3_3
//! Parameters: a00 a01 a02 a10 a11 a12 a20 a21 a22 tx ty tz
//! FixedParameters: cx cy cz
//! ```
//!
//! ITK stores points in LPS; the returned transform is converted to RAS.

use anyhow::{anyhow, bail, Context, Result};
use dtk_core::spatial::{Matrix3, Point3, Vector3};
use dtk_core::transform::AffineTransform;
use std::path::Path;
use tracing::warn;

use crate::frame::lps_to_ras;

const SUPPORTED_TYPES: [&str; 4] = [
    "AffineTransform_double_3_3",
    "AffineTransform_float_3_3",
    "MatrixOffsetTransformBase_double_3_3",
    "MatrixOffsetTransformBase_float_3_3",
];

fn parse_numbers(line: &str, key: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .with_context(|| format!("Invalid number '{token}' in {key}"))
        })
        .collect()
}

/// Parse the first transform of an ITK text transform file, in LPS.
pub fn parse_itk_transform(text: &str) -> Result<AffineTransform> {
    let mut kind: Option<&str> = None;
    let mut parameters: Option<Vec<f64>> = None;
    let mut fixed: Option<Vec<f64>> = None;
    let mut transforms = 0;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            bail!("Unexpected line '{line}'");
        };
        let value = value.trim();
        match key.trim() {
            "Transform" => {
                transforms += 1;
                if transforms == 1 {
                    kind = Some(value);
                }
            }
            "Parameters" if transforms == 1 => parameters = Some(parse_numbers(value, "Parameters")?),
            "FixedParameters" if transforms == 1 => {
                fixed = Some(parse_numbers(value, "FixedParameters")?)
            }
            _ => {}
        }
    }

    if transforms > 1 {
        warn!("Transform file holds {} transforms; only the first is used", transforms);
    }
    let kind = kind.ok_or_else(|| anyhow!("Missing 'Transform:' line"))?;
    if !SUPPORTED_TYPES.contains(&kind) {
        bail!("Unsupported transform type '{kind}'");
    }

    let parameters = parameters.ok_or_else(|| anyhow!("Missing 'Parameters:' line"))?;
    if parameters.len() != 12 {
        bail!("Expected 12 parameters, found {}", parameters.len());
    }
    let center = match fixed.as_deref() {
        None | Some([]) => Point3::origin(),
        Some([x, y, z]) => Point3::new(*x, *y, *z),
        Some(other) => bail!("Expected 3 fixed parameters, found {}", other.len()),
    };

    let matrix = Matrix3::from_row_slice(&parameters[..9]);
    let translation = Vector3::new(parameters[9], parameters[10], parameters[11]);
    Ok(AffineTransform::from_center(matrix, translation, center))
}

/// Express an LPS affine transform in RAS.
pub fn lps_to_ras_transform(transform: &AffineTransform) -> AffineTransform {
    let flip = lps_to_ras();
    AffineTransform::new(flip * transform.matrix() * flip, flip * transform.offset())
}

/// Read an ITK text transform and convert it to RAS.
pub fn read_itk_transform<P: AsRef<Path>>(path: P) -> Result<AffineTransform> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transform file {}", path.display()))?;
    let transform = parse_itk_transform(&text)
        .with_context(|| format!("Failed to parse transform file {}", path.display()))?;
    Ok(lps_to_ras_transform(&transform))
}
