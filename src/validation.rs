//! K-fold cross-validation of surrogate models
//!
//! Estimates how well a backend generalises on the reference table without
//! touching the final trained model. Every fold fits a fresh estimator built
//! from the backend factory, so no weights are shared between folds.
//!
//! Fold sizes follow the usual convention: the first `n % k` folds hold
//! `⌈n/k⌉` rows and the rest `⌊n/k⌋`. Folds are evaluated in parallel.

use crate::error::{AbcError, AbcResult};
use crate::models::{Objective, ReferenceTable};
use crate::predict::{class_probabilities, most_probable};
use crate::surrogate::{Estimator, ModelBackend, Targets, TrainingData};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One train/test partition of the row indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Score computed on each held-out fold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Fraction of correctly classified rows (higher is better)
    Accuracy,
    /// Mean squared error over all outputs (lower is better)
    MeanSquaredError,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Accuracy => write!(f, "accuracy"),
            Metric::MeanSquaredError => write!(f, "mean squared error"),
        }
    }
}

/// Per-fold scores and their aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub metric: Metric,
    pub per_fold: Vec<f64>,
    pub fold_sizes: Vec<usize>,
    pub mean: f64,
    /// Population standard deviation of the fold scores
    pub std_dev: f64,
}

impl CrossValidationResult {
    fn from_scores(metric: Metric, per_fold: Vec<f64>, fold_sizes: Vec<usize>) -> Self {
        let k = per_fold.len().max(1) as f64;
        let mean = per_fold.iter().sum::<f64>() / k;
        let variance = per_fold.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / k;
        Self {
            metric,
            per_fold,
            fold_sizes,
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// Cross-validation settings, also used as the `[cross_validation]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidator {
    /// Run cross-validation as part of the pipeline
    pub enabled: bool,
    /// Number of folds
    pub folds: usize,
    /// Shuffle rows before partitioning
    pub shuffle: bool,
    /// Keep class proportions equal across folds (classification only)
    pub stratify: bool,
    /// Seed for shuffling; random when unset
    pub seed: Option<u64>,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self {
            enabled: false,
            folds: 5,
            shuffle: false,
            stratify: false,
            seed: None,
        }
    }
}

impl CrossValidator {
    /// Plain k-fold without shuffling or stratification
    pub fn new(folds: usize) -> Self {
        Self {
            folds,
            ..Default::default()
        }
    }

    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn with_stratification(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    /// Partition `n` rows into folds
    ///
    /// When stratifying, `labels` gives each row's class and rows of each
    /// class are dealt round-robin over the folds.
    pub fn folds(&self, n: usize, labels: Option<&[usize]>) -> AbcResult<Vec<Fold>> {
        let k = self.folds;
        if k < 2 {
            return Err(AbcError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {k}"
            )));
        }
        if k > n {
            return Err(AbcError::InvalidConfig(format!(
                "cannot split {n} rows into {k} folds"
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        if self.shuffle {
            let seed = self.seed.unwrap_or_else(|| rand::rng().random());
            order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
        }

        let mut assignment = vec![0usize; n];
        match labels.filter(|_| self.stratify) {
            Some(labels) => {
                if labels.len() != n {
                    return Err(AbcError::shape("stratification labels", n, labels.len()));
                }
                let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
                let mut dealt = 0usize;
                for class in 0..n_classes {
                    for &row in order.iter().filter(|&&row| labels[row] == class) {
                        assignment[row] = dealt % k;
                        dealt += 1;
                    }
                }
            }
            None => {
                let base = n / k;
                let remainder = n % k;
                let mut start = 0;
                for fold in 0..k {
                    let size = base + usize::from(fold < remainder);
                    for &row in &order[start..start + size] {
                        assignment[row] = fold;
                    }
                    start += size;
                }
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    order.iter().copied().partition(|&row| assignment[row] == fold);
                Fold { train, test }
            })
            .collect())
    }

    /// Score a backend with k-fold cross-validation
    ///
    /// `backend_factory` is called once per fold; each fold trains its own
    /// estimator on the other folds and is scored on its held-out rows.
    pub fn evaluate<F>(&self, data: &TrainingData<'_>, backend_factory: F) -> AbcResult<CrossValidationResult>
    where
        F: Fn() -> ModelBackend + Sync,
    {
        let labels = match &data.targets {
            Targets::Classes { labels, .. } => Some(labels.as_slice()),
            Targets::Values { .. } => None,
        };
        let metric = match labels {
            Some(_) => Metric::Accuracy,
            None => Metric::MeanSquaredError,
        };
        let folds = self.folds(data.len(), labels)?;

        info!(
            "Cross-validating on {} rows with {} folds ({})",
            data.len(),
            folds.len(),
            metric
        );

        let scores = folds
            .par_iter()
            .enumerate()
            .map(|(i, fold)| {
                let backend = backend_factory();
                let backend = match backend.seed() {
                    Some(seed) => backend.with_seed(seed.wrapping_add(i as u64)),
                    None => backend,
                };
                let train = data.subset(&fold.train);
                let test = data.subset(&fold.test);
                let estimator = backend.fit(&train)?;
                let score = score_fold(estimator.as_ref(), &test);
                debug!("Fold {}: {} = {:.4}", i + 1, metric, score);
                Ok(score)
            })
            .collect::<AbcResult<Vec<f64>>>()?;

        let sizes = folds.iter().map(|f| f.test.len()).collect();
        let result = CrossValidationResult::from_scores(metric, scores, sizes);
        info!(
            "Cross-validation {}: mean={:.4}, std={:.4}",
            metric, result.mean, result.std_dev
        );
        Ok(result)
    }

    /// Cross-validate a backend on the rows an objective needs from a table
    pub fn evaluate_table(
        &self,
        table: &ReferenceTable,
        objective: &Objective,
        backend: &ModelBackend,
    ) -> AbcResult<CrossValidationResult> {
        let data = TrainingData::from_table(table, objective)?;
        self.evaluate(&data, || backend.clone())
    }
}

/// Accuracy (classification) or mean squared error (regression) on a fold
fn score_fold(estimator: &dyn Estimator, test: &TrainingData<'_>) -> f64 {
    match &test.targets {
        Targets::Classes { labels, .. } => {
            let correct = test
                .features
                .iter()
                .zip(labels)
                .filter(|(x, label)| {
                    most_probable(&class_probabilities(estimator.predict_row(x))) == **label
                })
                .count();
            correct as f64 / test.len().max(1) as f64
        }
        Targets::Values { values, dim } => {
            let total: f64 = test
                .features
                .iter()
                .zip(values)
                .map(|(x, y)| {
                    estimator
                        .predict_row(x)
                        .iter()
                        .zip(y.iter())
                        .map(|(p, t)| (p - t).powi(2))
                        .sum::<f64>()
                })
                .sum();
            total / (test.len() * dim).max(1) as f64
        }
    }
}
