//! Final report for an inference run
//!
//! - Model comparison: Bayes factors from the reference table's model
//!   frequencies, plus the surrogate's model probabilities for the observed
//!   data and the posterior odds derived from them.
//! - Parameter inference: descriptive statistics of the reference table's
//!   parameters (prior spread), plus the named point estimate.

mod bayes;
mod float;
mod summary;

pub use bayes::{BayesFactorCalculator, BayesFactorMatrix};
pub use summary::{ParameterStats, ParameterSummary};

use crate::error::{AbcError, AbcResult};
use crate::models::{Objective, Prediction, ReferenceTable};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A named value from the surrogate's prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    #[serde(with = "float::scalar")]
    pub value: f64,
}

fn named(names: &[String], values: &[f64]) -> Vec<NamedValue> {
    names
        .iter()
        .zip(values)
        .map(|(name, &value)| NamedValue {
            name: name.clone(),
            value,
        })
        .collect()
}

/// Report handed to the application layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "objective", rename_all = "lowercase")]
pub enum Report {
    Comparison {
        /// Odds from reference-table draw counts
        bayes_factors: BayesFactorMatrix,
        /// Surrogate probability of each model for the observed data
        model_probabilities: Vec<NamedValue>,
        /// Odds from the predicted model probabilities
        posterior_odds: BayesFactorMatrix,
    },
    Inference {
        /// Spread of the simulated parameters
        parameters: ParameterSummary,
        /// Surrogate point estimate for the observed data
        estimate: Vec<NamedValue>,
    },
}

impl Report {
    /// The count-based Bayes-factor matrix, for comparison reports
    pub fn bayes_factors(&self) -> Option<&BayesFactorMatrix> {
        match self {
            Report::Comparison { bayes_factors, .. } => Some(bayes_factors),
            Report::Inference { .. } => None,
        }
    }

    /// The parameter summary, for inference reports
    pub fn parameter_summary(&self) -> Option<&ParameterSummary> {
        match self {
            Report::Inference { parameters, .. } => Some(parameters),
            Report::Comparison { .. } => None,
        }
    }
}

/// Assembles reports for either objective
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator {
    calculator: BayesFactorCalculator,
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &self,
        objective: &Objective,
        table: &ReferenceTable,
        prediction: &Prediction,
    ) -> AbcResult<Report> {
        if table.is_empty() {
            return Err(AbcError::EmptyReferenceTable);
        }

        let report = match (objective, prediction) {
            (Objective::Comparison { model_names }, Prediction::ModelProbabilities(probs)) => {
                if probs.len() != model_names.len() {
                    return Err(AbcError::shape(
                        "model probabilities",
                        model_names.len(),
                        probs.len(),
                    ));
                }
                let bayes_factors = self.calculator.from_table(table, model_names)?;
                let posterior_odds = self.calculator.compute_from_weights(probs, model_names)?;
                Report::Comparison {
                    bayes_factors,
                    model_probabilities: named(model_names, probs),
                    posterior_odds,
                }
            }
            (Objective::Inference { param_names }, Prediction::ParameterEstimate(estimate)) => {
                if estimate.len() != param_names.len() {
                    return Err(AbcError::shape(
                        "parameter estimate",
                        param_names.len(),
                        estimate.len(),
                    ));
                }
                Report::Inference {
                    parameters: ParameterSummary::from_table(table, param_names)?,
                    estimate: named(param_names, estimate),
                }
            }
            (_, other) => {
                let expected = match objective {
                    Objective::Comparison { .. } => "model probabilities",
                    Objective::Inference { .. } => "parameter estimate",
                };
                return Err(AbcError::ObjectiveMismatch {
                    expected,
                    found: other.kind_name(),
                });
            }
        };

        info!("Assembled {} report", objective.kind());
        Ok(report)
    }
}
