//! Applying a trained surrogate to observed statistics

use crate::error::{AbcError, AbcResult};
use crate::models::{ObservedStatistics, Prediction};
use crate::surrogate::SurrogateModel;
use tracing::debug;

/// Expand a classifier's native output into per-model probabilities
///
/// A single sigmoid unit is the probability of model 1, so the two-model
/// distribution is `[1 - p, p]`. Wider outputs are already a distribution
/// and are returned untouched.
pub(crate) fn class_probabilities(output: Vec<f64>) -> Vec<f64> {
    if output.len() == 1 {
        vec![1.0 - output[0], output[0]]
    } else {
        output
    }
}

/// Index of the largest probability (first one on ties)
pub(crate) fn most_probable(probabilities: &[f64]) -> usize {
    probabilities
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_p), (i, &p)| {
            if p > best_p {
                (i, p)
            } else {
                (best, best_p)
            }
        })
        .0
}

/// Applies surrogates to observed data
#[derive(Debug, Clone, Copy, Default)]
pub struct Predictor;

impl Predictor {
    /// Model probabilities (classifier) or a parameter point estimate (regressor)
    pub fn predict(&self, model: &SurrogateModel, observed: &ObservedStatistics) -> AbcResult<Prediction> {
        let expected = model.input_dim();
        if observed.len() != expected {
            return Err(AbcError::shape(
                "observed statistics",
                expected,
                observed.len(),
            ));
        }

        let output = model.estimator().predict_row(observed.values());
        let prediction = match model {
            SurrogateModel::Classifier { .. } => {
                Prediction::ModelProbabilities(class_probabilities(output))
            }
            SurrogateModel::Regressor { .. } => Prediction::ParameterEstimate(output),
        };
        debug!("Prediction for observed data: {:?}", prediction);
        Ok(prediction)
    }
}

/// Apply a surrogate to observed statistics
pub fn predict(model: &SurrogateModel, observed: &ObservedStatistics) -> AbcResult<Prediction> {
    Predictor.predict(model, observed)
}
