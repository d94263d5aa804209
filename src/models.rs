//! Core data models for abrox
//!
//! These types describe what flows through an inference run: the simulated
//! reference table, the observed statistics, the objective and the
//! prediction produced for the observed data.

use crate::error::{AbcError, AbcResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One simulated draw from the reference table
///
/// Field names match the columns of a simulator's output (`idx`, `param`,
/// `sumstat`). A draw used for model comparison carries `idx`; a draw used
/// for parameter inference carries `param`. Carrying both is allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    /// Index of the model that produced this draw
    #[serde(rename = "idx", default, skip_serializing_if = "Option::is_none")]
    pub model_index: Option<usize>,
    /// Parameter vector the simulator was run with
    #[serde(rename = "param", default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<f64>>,
    /// Summary statistics of the simulated dataset
    #[serde(rename = "sumstat")]
    pub summary_statistics: Vec<f64>,
}

impl Draw {
    /// A draw labelled with the model that generated it
    pub fn model(model_index: usize, summary_statistics: Vec<f64>) -> Self {
        Self {
            model_index: Some(model_index),
            parameters: None,
            summary_statistics,
        }
    }

    /// A draw labelled with the parameters it was simulated from
    pub fn parameters(parameters: Vec<f64>, summary_statistics: Vec<f64>) -> Self {
        Self {
            model_index: None,
            parameters: Some(parameters),
            summary_statistics,
        }
    }
}

/// Immutable table of simulated draws
///
/// All rows share the same statistic dimension `d`, and every row that
/// carries parameters shares the same parameter dimension `p`. Both are
/// checked on construction, including when the table is deserialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Draw>", into = "Vec<Draw>")]
pub struct ReferenceTable {
    rows: Vec<Draw>,
    stat_dim: usize,
    param_dim: Option<usize>,
}

impl ReferenceTable {
    /// Build a table, validating that dimensions agree across rows
    pub fn new(rows: Vec<Draw>) -> AbcResult<Self> {
        let stat_dim = rows.first().map(|r| r.summary_statistics.len()).unwrap_or(0);
        let mut param_dim: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if row.summary_statistics.len() != stat_dim {
                return Err(AbcError::shape(
                    format!("summary statistics of row {i}"),
                    stat_dim,
                    row.summary_statistics.len(),
                ));
            }
            if let Some(params) = &row.parameters {
                match param_dim {
                    None => param_dim = Some(params.len()),
                    Some(p) if p != params.len() => {
                        return Err(AbcError::shape(
                            format!("parameters of row {i}"),
                            p,
                            params.len(),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(Self {
            rows,
            stat_dim,
            param_dim,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Summary statistic dimension `d` (0 for an empty table)
    pub fn stat_dim(&self) -> usize {
        self.stat_dim
    }

    /// Parameter dimension `p`, if any row carries parameters
    pub fn param_dim(&self) -> Option<usize> {
        self.param_dim
    }

    pub fn rows(&self) -> &[Draw] {
        &self.rows
    }

    /// Borrowed view of every row's summary statistics
    pub fn summary_statistics(&self) -> Vec<&[f64]> {
        self.rows
            .iter()
            .map(|r| r.summary_statistics.as_slice())
            .collect()
    }

    /// Model index of every row; fails on the first row without one
    pub fn model_indices(&self) -> AbcResult<Vec<usize>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| r.model_index.ok_or(AbcError::MissingField { row, field: "idx" }))
            .collect()
    }

    /// Parameter vector of every row; fails on the first row without one
    pub fn parameters(&self) -> AbcResult<Vec<&[f64]>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                r.parameters
                    .as_deref()
                    .ok_or(AbcError::MissingField { row, field: "param" })
            })
            .collect()
    }

    /// How often each model index was drawn, zero-filled up to `n_models`
    pub fn model_counts(&self, n_models: usize) -> AbcResult<Vec<u64>> {
        let mut counts = vec![0u64; n_models];
        for (row, index) in self.model_indices()?.into_iter().enumerate() {
            let slot = counts.get_mut(index).ok_or(AbcError::InvalidModelIndex {
                row,
                index,
                n_models,
            })?;
            *slot += 1;
        }
        Ok(counts)
    }
}

impl TryFrom<Vec<Draw>> for ReferenceTable {
    type Error = AbcError;

    fn try_from(rows: Vec<Draw>) -> AbcResult<Self> {
        Self::new(rows)
    }
}

impl From<ReferenceTable> for Vec<Draw> {
    fn from(table: ReferenceTable) -> Self {
        table.rows
    }
}

/// Observed summary statistics, already scaled like the training statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedStatistics(pub Vec<f64>);

impl ObservedStatistics {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// String form of the objective, as found in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveKind {
    /// Model selection
    #[default]
    Comparison,
    /// Parameter estimation
    Inference,
}

impl FromStr for ObjectiveKind {
    type Err = AbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comparison" => Ok(ObjectiveKind::Comparison),
            "inference" => Ok(ObjectiveKind::Inference),
            _ => Err(AbcError::UnsupportedObjective(s.to_string())),
        }
    }
}

impl std::fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveKind::Comparison => write!(f, "comparison"),
            ObjectiveKind::Inference => write!(f, "inference"),
        }
    }
}

/// What an inference run is asked to do, with the labels that belong to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "objective", rename_all = "lowercase")]
pub enum Objective {
    Comparison { model_names: Vec<String> },
    Inference { param_names: Vec<String> },
}

impl Objective {
    pub fn kind(&self) -> ObjectiveKind {
        match self {
            Objective::Comparison { .. } => ObjectiveKind::Comparison,
            Objective::Inference { .. } => ObjectiveKind::Inference,
        }
    }

    /// Build an objective from its string form
    pub fn parse(
        objective: &str,
        model_names: Vec<String>,
        param_names: Vec<String>,
    ) -> AbcResult<Self> {
        Ok(match objective.parse::<ObjectiveKind>()? {
            ObjectiveKind::Comparison => Objective::Comparison { model_names },
            ObjectiveKind::Inference => Objective::Inference { param_names },
        })
    }
}

/// Output of applying a trained surrogate to observed statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    /// Probability of each model, in model-index order
    ModelProbabilities(Vec<f64>),
    /// Point estimate of each parameter
    ParameterEstimate(Vec<f64>),
}

impl Prediction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Prediction::ModelProbabilities(_) => "model probabilities",
            Prediction::ParameterEstimate(_) => "parameter estimate",
        }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            Prediction::ModelProbabilities(v) | Prediction::ParameterEstimate(v) => v,
        }
    }
}
