//! Bayes-factor matrices
//!
//! Cell `(j, i)` below the diagonal holds `w[j] / w[i]` for `i < j`, and the
//! mirrored cell `(i, j)` holds its reciprocal. Zero weights never raise: a
//! zero numerator gives `0` (reciprocal `+∞`), and a pair of zeros gives
//! `NaN` in both cells because the odds are undefined.

use crate::error::{AbcError, AbcResult};
use crate::models::ReferenceTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pairwise odds between models, labelled by model name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesFactorMatrix {
    pub model_names: Vec<String>,
    /// Row-major `n x n` values; non-finite cells serialise as `"inf"`, `"-inf"` or `"NaN"`
    #[serde(with = "super::float::matrix")]
    pub values: Vec<Vec<f64>>,
}

impl BayesFactorMatrix {
    pub fn n_models(&self) -> usize {
        self.model_names.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }

    /// Odds of `numerator` against `denominator`, looked up by name
    pub fn odds(&self, numerator: &str, denominator: &str) -> Option<f64> {
        let row = self.model_names.iter().position(|n| n == numerator)?;
        let col = self.model_names.iter().position(|n| n == denominator)?;
        Some(self.values[row][col])
    }
}

/// Builds Bayes-factor matrices from draw counts or model weights
#[derive(Debug, Clone, Copy, Default)]
pub struct BayesFactorCalculator;

impl BayesFactorCalculator {
    /// Matrix from how often each model was drawn
    pub fn compute(&self, counts: &[u64], model_names: &[String]) -> AbcResult<BayesFactorMatrix> {
        let weights: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        self.compute_from_weights(&weights, model_names)
    }

    /// Matrix from non-negative per-model weights (counts or probabilities)
    pub fn compute_from_weights(
        &self,
        weights: &[f64],
        model_names: &[String],
    ) -> AbcResult<BayesFactorMatrix> {
        let n = weights.len();
        if model_names.len() != n {
            return Err(AbcError::shape("model names", n, model_names.len()));
        }
        if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(AbcError::InvalidConfig(format!(
                "model weights must be finite and non-negative, got {w}"
            )));
        }

        let mut values = vec![vec![1.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let (lower, upper) = pair_odds(weights[i], weights[j]);
                values[j][i] = lower;
                values[i][j] = upper;
            }
        }

        debug!("Bayes factor matrix for {} models: {:?}", n, values);
        Ok(BayesFactorMatrix {
            model_names: model_names.to_vec(),
            values,
        })
    }

    /// Matrix from the model-index frequencies of a reference table
    pub fn from_table(
        &self,
        table: &ReferenceTable,
        model_names: &[String],
    ) -> AbcResult<BayesFactorMatrix> {
        let counts = table.model_counts(model_names.len())?;
        self.compute(&counts, model_names)
    }
}

/// `(w_j / w_i, w_i / w_j)` with the zero substitutions described above
fn pair_odds(w_i: f64, w_j: f64) -> (f64, f64) {
    if w_i == 0.0 && w_j == 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let ratio = w_j / w_i;
    (ratio, 1.0 / ratio)
}
