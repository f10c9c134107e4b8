//! Transform series descriptors.
//!
//! ```xml
//! <TransformationList>
//!   <Transformation>
//!     <Type>linear</Type>
//!     <Path>affine.txt</Path>
//!     <Inversion>0</Inversion>
//!   </Transformation>
//! </TransformationList>
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DtkError, Result};

/// Kind of a series entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Matrix + offset.
    Linear,
    /// Stationary velocity field.
    Svf,
    /// Dense displacement field.
    Dense,
}

impl FromStr for TransformKind {
    type Err = DtkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "svf" => Ok(Self::Svf),
            "dense" => Ok(Self::Dense),
            other => Err(DtkError::malformed(format!("unknown transform type '{other}'"))),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Linear => write!(f, "linear"),
            TransformKind::Svf => write!(f, "svf"),
            TransformKind::Dense => write!(f, "dense"),
        }
    }
}

/// One entry of a transform series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDescriptor {
    pub kind: TransformKind,
    pub path: PathBuf,
    pub invert: bool,
}

impl TransformDescriptor {
    pub fn new(kind: TransformKind, path: impl Into<PathBuf>, invert: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            invert,
        }
    }
}

/// Ordered list of transforms, listed moving to fixed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    pub entries: Vec<TransformDescriptor>,
    /// Series-level inversion, when the document sets it.
    pub invert_series: Option<bool>,
    /// Velocity exponentiation order, when the document sets it.
    pub exponentiation_order: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(rename = "InvertSeries", default)]
    invert_series: Option<String>,
    #[serde(rename = "ExponentiationOrder", default)]
    exponentiation_order: Option<String>,
    #[serde(rename = "Transformation", default)]
    transformations: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "Type", default)]
    kind: Option<String>,
    #[serde(rename = "Path", default)]
    path: Option<String>,
    #[serde(rename = "Inversion", default)]
    inversion: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "0" | "false" => Some(false),
        "1" | "true" => Some(true),
        _ => None,
    }
}

impl SeriesDescriptor {
    pub fn new(entries: Vec<TransformDescriptor>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Parse an XML descriptor.
    ///
    /// Relative entry paths are joined onto `base_dir` when given.
    ///
    /// # Errors
    /// Returns `MalformedSeriesDescriptor` for invalid XML, a missing or
    /// unknown `<Type>`, a missing `<Path>` or an unparseable flag.
    pub fn from_xml_str(text: &str, base_dir: Option<&Path>) -> Result<Self> {
        if !text.contains("<TransformationList") {
            return Err(DtkError::malformed("missing <TransformationList> root"));
        }
        let raw: RawSeries =
            quick_xml::de::from_str(text).map_err(|e| DtkError::malformed(e.to_string()))?;

        let invert_series = non_empty(&raw.invert_series)
            .map(|v| {
                parse_flag(v).ok_or_else(|| {
                    DtkError::malformed(format!("invalid <InvertSeries> value '{v}'"))
                })
            })
            .transpose()?;
        let exponentiation_order = non_empty(&raw.exponentiation_order)
            .map(|v| {
                v.parse::<u32>().map_err(|_| {
                    DtkError::malformed(format!("invalid <ExponentiationOrder> value '{v}'"))
                })
            })
            .transpose()?;

        let entries = raw
            .transformations
            .iter()
            .enumerate()
            .map(|(i, entry)| Self::parse_entry(i + 1, entry, base_dir))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            entries,
            invert_series,
            exponentiation_order,
        })
    }

    fn parse_entry(
        position: usize,
        entry: &RawEntry,
        base_dir: Option<&Path>,
    ) -> Result<TransformDescriptor> {
        let kind = non_empty(&entry.kind)
            .ok_or_else(|| DtkError::malformed(format!("entry {position}: missing <Type>")))?;
        let kind = kind.parse::<TransformKind>().map_err(|_| {
            DtkError::malformed(format!("entry {position}: unknown transform type '{kind}'"))
        })?;

        let path = non_empty(&entry.path)
            .ok_or_else(|| DtkError::malformed(format!("entry {position}: missing <Path>")))?;
        let path = match base_dir {
            Some(dir) if Path::new(path).is_relative() => dir.join(path),
            _ => PathBuf::from(path),
        };

        let invert = match non_empty(&entry.inversion) {
            None => false,
            Some(v) => parse_flag(v).ok_or_else(|| {
                DtkError::malformed(format!("entry {position}: invalid <Inversion> value '{v}'"))
            })?,
        };

        Ok(TransformDescriptor { kind, path, invert })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIES: &str = r#"<?xml version="1.0"?>
<TransformationList>
  <Transformation>
    <Type>linear</Type>
    <Path>affine.txt</Path>
    <Inversion>0</Inversion>
  </Transformation>
  <Transformation>
    <Type>svf</Type>
    <Path>/abs/velocity.nii.gz</Path>
    <Inversion>1</Inversion>
  </Transformation>
</TransformationList>"#;

    #[test]
    fn test_parse_series() {
        let series = SeriesDescriptor::from_xml_str(SERIES, Some(Path::new("/data"))).unwrap();

        assert_eq!(
            series.entries,
            vec![
                TransformDescriptor::new(TransformKind::Linear, "/data/affine.txt", false),
                TransformDescriptor::new(TransformKind::Svf, "/abs/velocity.nii.gz", true),
            ]
        );
        assert_eq!(series.invert_series, None);
        assert_eq!(series.exponentiation_order, None);
    }

    #[test]
    fn test_series_level_elements() {
        let text = r#"<TransformationList>
  <InvertSeries>true</InvertSeries>
  <ExponentiationOrder>1</ExponentiationOrder>
  <Transformation><Type>dense</Type><Path>d.nii</Path></Transformation>
</TransformationList>"#;
        let series = SeriesDescriptor::from_xml_str(text, None).unwrap();

        assert_eq!(series.invert_series, Some(true));
        assert_eq!(series.exponentiation_order, Some(1));
        assert_eq!(series.entries[0].path, PathBuf::from("d.nii"));
        assert!(!series.entries[0].invert);
    }

    #[test]
    fn test_empty_list() {
        let series = SeriesDescriptor::from_xml_str("<TransformationList></TransformationList>", None)
            .unwrap();
        assert!(series.entries.is_empty());
    }

    #[test]
    fn test_missing_path_is_malformed() {
        let text = "<TransformationList><Transformation><Type>linear</Type></Transformation></TransformationList>";
        let err = SeriesDescriptor::from_xml_str(text, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed transform series descriptor: entry 1: missing <Path>"
        );
    }

    #[test]
    fn test_unknown_type_and_flag() {
        let text = "<TransformationList><Transformation><Type>bspline</Type><Path>a</Path></Transformation></TransformationList>";
        assert!(matches!(
            SeriesDescriptor::from_xml_str(text, None),
            Err(DtkError::MalformedSeriesDescriptor(_))
        ));

        let text = "<TransformationList><Transformation><Type>linear</Type><Path>a</Path><Inversion>maybe</Inversion></Transformation></TransformationList>";
        assert!(SeriesDescriptor::from_xml_str(text, None).is_err());
    }

    #[test]
    fn test_invalid_xml() {
        assert!(SeriesDescriptor::from_xml_str("<TransformationList><Transformation>", None).is_err());
        assert!(SeriesDescriptor::from_xml_str("not xml", None).is_err());
    }
}
