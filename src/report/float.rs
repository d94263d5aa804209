//! Serde helpers for report numbers that may be non-finite
//!
//! JSON has no number form for infinity or NaN. Such values are written as
//! the strings `"inf"`, `"-inf"` and `"NaN"` and read back from them, so a
//! zero-count substitution (`inf`) stays distinct from an undefined ratio
//! (`NaN`). Finite values stay plain numbers.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// One report number with the string encoding above
#[derive(Debug, Clone, Copy)]
struct ReportFloat(f64);

impl Serialize for ReportFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_nan() {
            serializer.serialize_str("NaN")
        } else if v == f64::INFINITY {
            serializer.serialize_str("inf")
        } else if v == f64::NEG_INFINITY {
            serializer.serialize_str("-inf")
        } else {
            serializer.serialize_f64(v)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for ReportFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(ReportFloat(v)),
            Repr::Text(s) => match s.as_str() {
                "inf" | "+inf" | "infinity" => Ok(ReportFloat(f64::INFINITY)),
                "-inf" | "-infinity" => Ok(ReportFloat(f64::NEG_INFINITY)),
                "NaN" | "nan" => Ok(ReportFloat(f64::NAN)),
                other => Err(de::Error::custom(format!(
                    "expected a number, \"inf\", \"-inf\" or \"NaN\", got \"{other}\""
                ))),
            },
        }
    }
}

/// `#[serde(with = "float::scalar")]` for a single `f64`
pub(crate) mod scalar {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        ReportFloat(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        ReportFloat::deserialize(deserializer).map(|f| f.0)
    }
}

/// `#[serde(with = "float::matrix")]` for a row-major `Vec<Vec<f64>>`
pub(crate) mod matrix {
    use super::*;

    pub fn serialize<S: Serializer>(rows: &[Vec<f64>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            rows.iter()
                .map(|row| row.iter().map(|&v| ReportFloat(v)).collect::<Vec<_>>()),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<f64>>, D::Error> {
        let rows = Vec::<Vec<ReportFloat>>::deserialize(deserializer)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(|f| f.0).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Cell {
        #[serde(with = "scalar")]
        value: f64,
    }

    #[test]
    fn test_non_finite_written_as_strings() {
        let json = serde_json::to_string(&[
            Cell { value: f64::INFINITY },
            Cell { value: f64::NEG_INFINITY },
            Cell { value: f64::NAN },
            Cell { value: 0.5 },
        ])
        .unwrap();
        assert_eq!(
            json,
            r#"[{"value":"inf"},{"value":"-inf"},{"value":"NaN"},{"value":0.5}]"#
        );
    }

    #[test]
    fn test_reads_numbers_and_strings() {
        let cells: Vec<Cell> =
            serde_json::from_str(r#"[{"value":"inf"},{"value":"NaN"},{"value":2},{"value":-1.5}]"#)
                .unwrap();
        assert_eq!(cells[0].value, f64::INFINITY);
        assert!(cells[1].value.is_nan());
        assert_eq!(cells[2].value, 2.0);
        assert_eq!(cells[3].value, -1.5);
    }

    #[test]
    fn test_rejects_other_strings() {
        assert!(serde_json::from_str::<Cell>(r#"{"value":"big"}"#).is_err());
        assert!(serde_json::from_str::<Cell>(r#"{"value":null}"#).is_err());
    }
}
