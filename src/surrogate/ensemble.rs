//! Gradient-boosted tree ensemble surrogate
//!
//! Wraps the `gbdt` crate to provide:
//! - Binary classification with one `LogLikelyhood` booster (label 1.0 for
//!   model 1, -1.0 for model 0), whose output is a calibrated probability
//! - Multi-class classification with one-vs-rest boosters; the per-class
//!   scores are normalised here, so the ensemble's native output is a
//!   probability distribution
//! - Regression with one `SquaredError` booster per output
//!
//! Summary statistics and targets are narrowed to `f32` when a booster is
//! built or queried. Statistics outside the `f32` range saturate to infinity,
//! and boosted scores are widened back to `f64`.
//!
//! Row and feature sampling stay at 1.0, so fitting is deterministic without
//! a seed.

use super::{Estimator, Targets, TrainingData};
use crate::error::{AbcError, AbcResult};
use gbdt::config::Config;
use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Boosting hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Number of boosting iterations per booster
    pub trees: usize,
    /// Maximum tree depth
    pub max_depth: u32,
    /// Shrinkage / step size
    pub learning_rate: f64,
    /// Minimum rows per leaf
    pub min_leaf_size: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 6,
            learning_rate: 0.1,
            min_leaf_size: 1,
        }
    }
}

#[inline]
fn row_to_f32(row: &[f64]) -> Vec<f32> {
    row.iter().map(|&v| v as f32).collect()
}

/// How the boosters' outputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnsembleKind {
    Binary,
    OneVsRest,
    Regression,
}

/// One or more fitted boosters acting as a single estimator
pub struct TreeEnsemble {
    boosters: Vec<GBDT>,
    kind: EnsembleKind,
    input_dim: usize,
}

impl TreeEnsemble {
    /// Fit boosters for the task described by `data`
    pub fn fit(config: &EnsembleConfig, data: &TrainingData<'_>) -> AbcResult<Self> {
        if data.is_empty() {
            return Err(AbcError::EmptyReferenceTable);
        }
        if config.trees == 0 || config.max_depth == 0 {
            return Err(AbcError::InvalidConfig(
                "trees and max_depth must be positive".into(),
            ));
        }
        if !(config.learning_rate > 0.0) {
            return Err(AbcError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                config.learning_rate
            )));
        }

        let input_dim = data.input_dim();
        let (kind, label_sets): (EnsembleKind, Vec<Vec<f32>>) = match &data.targets {
            Targets::Classes { labels, n_classes: 2 } => (
                EnsembleKind::Binary,
                vec![labels.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect()],
            ),
            Targets::Classes { labels, n_classes } => (
                EnsembleKind::OneVsRest,
                (0..*n_classes)
                    .map(|c| labels.iter().map(|&l| if l == c { 1.0 } else { -1.0 }).collect())
                    .collect(),
            ),
            Targets::Values { values, dim } => (
                EnsembleKind::Regression,
                (0..*dim)
                    .map(|j| values.iter().map(|v| v[j] as f32).collect())
                    .collect(),
            ),
        };

        let loss = match kind {
            EnsembleKind::Regression => "SquaredError",
            EnsembleKind::Binary | EnsembleKind::OneVsRest => "LogLikelyhood",
        };

        info!(
            "Fitting {} booster(s) with {} trees each (max_depth={}, loss={})",
            label_sets.len(),
            config.trees,
            config.max_depth,
            loss
        );

        let boosters = label_sets
            .iter()
            .map(|labels| fit_booster(config, input_dim, loss, &data.features, labels))
            .collect();

        Ok(Self {
            boosters,
            kind,
            input_dim,
        })
    }

    /// Number of fitted boosters
    pub fn booster_count(&self) -> usize {
        self.boosters.len()
    }
}

fn fit_booster(
    config: &EnsembleConfig,
    feature_size: usize,
    loss: &str,
    features: &[&[f64]],
    labels: &[f32],
) -> GBDT {
    let mut cfg = Config::new();
    cfg.set_feature_size(feature_size);
    cfg.set_max_depth(config.max_depth);
    cfg.set_iterations(config.trees);
    cfg.set_shrinkage(config.learning_rate as f32);
    cfg.set_loss(loss);
    cfg.set_debug(false);
    cfg.set_training_optimization_level(2);
    cfg.set_min_leaf_size(config.min_leaf_size.max(1));

    let mut gbdt = GBDT::new(&cfg);
    let mut training_data: Vec<Data> = features
        .iter()
        .zip(labels.iter())
        .map(|(f, &label)| Data::new_training_data(row_to_f32(f), 1.0_f32, label, None))
        .collect();

    gbdt.fit(&mut training_data);
    gbdt
}

impl Estimator for TreeEnsemble {
    fn predict_row(&self, x: &[f64]) -> Vec<f64> {
        let data = vec![Data::new_test_data(row_to_f32(x), None)];
        let raw: Vec<f64> = self
            .boosters
            .iter()
            .map(|b| b.predict(&data).first().copied().unwrap_or(0.0) as f64)
            .collect();

        match self.kind {
            EnsembleKind::Binary | EnsembleKind::Regression => raw,
            EnsembleKind::OneVsRest => {
                let scores: Vec<f64> = raw.iter().map(|p| p.clamp(0.0, 1.0)).collect();
                let total: f64 = scores.iter().sum();
                if total > 0.0 {
                    scores.iter().map(|s| s / total).collect()
                } else {
                    vec![1.0 / scores.len() as f64; scores.len()]
                }
            }
        }
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.boosters.len()
    }
}
