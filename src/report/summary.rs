//! Descriptive statistics for parameter columns

use crate::error::{AbcError, AbcResult};
use crate::models::ReferenceTable;
use serde::{Deserialize, Serialize};

/// Summary of one parameter's sampled values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterStats {
    pub name: String,
    pub count: usize,
    #[serde(with = "super::float::scalar")]
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); NaN for fewer than 2 values
    #[serde(with = "super::float::scalar")]
    pub std: f64,
    #[serde(with = "super::float::scalar")]
    pub min: f64,
    #[serde(with = "super::float::scalar")]
    pub q25: f64,
    #[serde(with = "super::float::scalar")]
    pub median: f64,
    #[serde(with = "super::float::scalar")]
    pub q75: f64,
    #[serde(with = "super::float::scalar")]
    pub max: f64,
}

impl ParameterStats {
    fn describe(name: &str, mut values: Vec<f64>) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                name: name.to_string(),
                count,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                q25: f64::NAN,
                median: f64::NAN,
                q75: f64::NAN,
                max: f64::NAN,
            };
        }

        values.sort_by(|a, b| a.total_cmp(b));
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Self {
            name: name.to_string(),
            count,
            mean,
            std,
            min: values[0],
            q25: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q75: quantile(&values, 0.75),
            max: values[count - 1],
        }
    }
}

/// Linearly interpolated quantile of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Per-parameter descriptive statistics, in parameter order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub parameters: Vec<ParameterStats>,
}

impl ParameterSummary {
    /// Summarise sample rows, one named column per parameter
    pub fn describe(names: &[String], samples: &[&[f64]]) -> AbcResult<Self> {
        if let Some((i, row)) = samples.iter().enumerate().find(|(_, r)| r.len() != names.len()) {
            return Err(AbcError::shape(
                format!("parameter names for sample {i}"),
                row.len(),
                names.len(),
            ));
        }

        let parameters = names
            .iter()
            .enumerate()
            .map(|(j, name)| ParameterStats::describe(name, samples.iter().map(|r| r[j]).collect()))
            .collect();

        Ok(Self { parameters })
    }

    /// Summarise the parameter column of a reference table (prior spread)
    pub fn from_table(table: &ReferenceTable, names: &[String]) -> AbcResult<Self> {
        let p = table.param_dim().unwrap_or(0);
        if names.len() != p {
            return Err(AbcError::shape("parameter names", p, names.len()));
        }
        Self::describe(names, &table.parameters()?)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterStats> {
        self.parameters.iter().find(|s| s.name == name)
    }
}
