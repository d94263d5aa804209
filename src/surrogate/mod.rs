//! Surrogate models for likelihood-free inference
//!
//! A surrogate replaces the intractable likelihood: it is trained on the
//! reference table to map summary statistics to either the generating model
//! (a classifier, for model comparison) or the generating parameters (a
//! regressor, for parameter inference).
//!
//! Two model families are available through [`ModelBackend`]:
//! - `NeuralNetwork`: dense ReLU network trained with Adam (see [`network`])
//! - `TreeEnsemble`: gradient-boosted decision trees (see [`ensemble`])
//!
//! The backend is always chosen by configuration; nothing in the trainer
//! hardcodes a model family.

pub mod ensemble;
pub mod network;

pub use ensemble::{EnsembleConfig, TreeEnsemble};
pub use network::{NetworkConfig, NeuralNetwork, OutputActivation};

use crate::error::{AbcError, AbcResult};
use crate::models::{Objective, ReferenceTable};
use tracing::info;

/// A fitted predictive model, independent of its family
///
/// `predict_row` returns the model's native output: a sigmoid probability
/// (one value) or a class distribution for classifiers, raw values for
/// regressors.
pub trait Estimator: Send + Sync {
    fn predict_row(&self, x: &[f64]) -> Vec<f64>;

    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;
}

/// What the estimator is being fitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Predict one of `n_classes` labels
    Classification { n_classes: usize },
    /// Predict `outputs` real values
    Regression { outputs: usize },
}

/// Training targets, aligned with the feature rows of [`TrainingData`]
#[derive(Debug, Clone)]
pub enum Targets<'a> {
    Classes { labels: Vec<usize>, n_classes: usize },
    Values { values: Vec<&'a [f64]>, dim: usize },
}

/// Borrowed design matrix and targets
///
/// Rows borrow from the reference table, so taking fold subsets for
/// cross-validation never copies statistics.
#[derive(Debug, Clone)]
pub struct TrainingData<'a> {
    pub features: Vec<&'a [f64]>,
    pub targets: Targets<'a>,
}

impl<'a> TrainingData<'a> {
    /// Extract the features and targets an objective needs from a table
    pub fn from_table(table: &'a ReferenceTable, objective: &Objective) -> AbcResult<Self> {
        if table.is_empty() {
            return Err(AbcError::EmptyReferenceTable);
        }

        let targets = match objective {
            Objective::Comparison { model_names } => {
                let n_classes = model_names.len();
                if n_classes < 2 {
                    return Err(AbcError::InvalidConfig(format!(
                        "model comparison needs at least 2 named models, got {n_classes}"
                    )));
                }
                let labels = table.model_indices()?;
                if let Some((row, &index)) =
                    labels.iter().enumerate().find(|(_, idx)| **idx >= n_classes)
                {
                    return Err(AbcError::InvalidModelIndex {
                        row,
                        index,
                        n_models: n_classes,
                    });
                }
                Targets::Classes { labels, n_classes }
            }
            Objective::Inference { .. } => {
                let values = table.parameters()?;
                let dim = table.param_dim().unwrap_or(0);
                if dim == 0 {
                    return Err(AbcError::InvalidConfig(
                        "parameter inference needs at least one parameter per draw".into(),
                    ));
                }
                Targets::Values { values, dim }
            }
        };

        Self::new(table.summary_statistics(), targets)
    }

    /// Build training data, checking row counts and dimensions
    pub fn new(features: Vec<&'a [f64]>, targets: Targets<'a>) -> AbcResult<Self> {
        if features.is_empty() {
            return Err(AbcError::EmptyReferenceTable);
        }
        let n_targets = match &targets {
            Targets::Classes { labels, .. } => labels.len(),
            Targets::Values { values, .. } => values.len(),
        };
        if n_targets != features.len() {
            return Err(AbcError::shape("target rows", features.len(), n_targets));
        }

        let d = features[0].len();
        if let Some((i, row)) = features.iter().enumerate().find(|(_, r)| r.len() != d) {
            return Err(AbcError::shape(
                format!("summary statistics of row {i}"),
                d,
                row.len(),
            ));
        }
        if let Targets::Values { values, dim } = &targets {
            if let Some((i, row)) = values.iter().enumerate().find(|(_, r)| r.len() != *dim) {
                return Err(AbcError::shape(format!("parameters of row {i}"), *dim, row.len()));
            }
        }

        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn input_dim(&self) -> usize {
        self.features.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn task(&self) -> Task {
        match &self.targets {
            Targets::Classes { n_classes, .. } => Task::Classification {
                n_classes: *n_classes,
            },
            Targets::Values { dim, .. } => Task::Regression { outputs: *dim },
        }
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> TrainingData<'a> {
        let features = indices.iter().map(|&i| self.features[i]).collect();
        let targets = match &self.targets {
            Targets::Classes { labels, n_classes } => Targets::Classes {
                labels: indices.iter().map(|&i| labels[i]).collect(),
                n_classes: *n_classes,
            },
            Targets::Values { values, dim } => Targets::Values {
                values: indices.iter().map(|&i| values[i]).collect(),
                dim: *dim,
            },
        };
        TrainingData { features, targets }
    }
}

/// Model family used for the surrogate, with its hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ModelBackend {
    NeuralNetwork(NetworkConfig),
    TreeEnsemble(EnsembleConfig),
}

impl Default for ModelBackend {
    fn default() -> Self {
        ModelBackend::NeuralNetwork(NetworkConfig::default())
    }
}

impl ModelBackend {
    pub fn name(&self) -> &'static str {
        match self {
            ModelBackend::NeuralNetwork(_) => "neural_network",
            ModelBackend::TreeEnsemble(_) => "tree_ensemble",
        }
    }

    /// Same backend with a fixed seed (tree ensembles are already deterministic)
    pub fn with_seed(&self, seed: u64) -> Self {
        match self {
            ModelBackend::NeuralNetwork(cfg) => ModelBackend::NeuralNetwork(NetworkConfig {
                seed: Some(seed),
                ..cfg.clone()
            }),
            ModelBackend::TreeEnsemble(cfg) => ModelBackend::TreeEnsemble(cfg.clone()),
        }
    }

    /// Seed configured on this backend, if any
    pub fn seed(&self) -> Option<u64> {
        match self {
            ModelBackend::NeuralNetwork(cfg) => cfg.seed,
            ModelBackend::TreeEnsemble(_) => None,
        }
    }

    /// Fit a fresh estimator of this family
    pub fn fit(&self, data: &TrainingData<'_>) -> AbcResult<Box<dyn Estimator>> {
        Ok(match self {
            ModelBackend::NeuralNetwork(cfg) => Box::new(NeuralNetwork::fit(cfg, data)?),
            ModelBackend::TreeEnsemble(cfg) => Box::new(TreeEnsemble::fit(cfg, data)?),
        })
    }
}

/// A trained surrogate for one inference run
pub enum SurrogateModel {
    /// Maps statistics to model probabilities
    Classifier {
        estimator: Box<dyn Estimator>,
        n_models: usize,
    },
    /// Maps statistics to parameter values
    Regressor {
        estimator: Box<dyn Estimator>,
        outputs: usize,
    },
}

impl SurrogateModel {
    pub fn estimator(&self) -> &dyn Estimator {
        match self {
            SurrogateModel::Classifier { estimator, .. }
            | SurrogateModel::Regressor { estimator, .. } => estimator.as_ref(),
        }
    }

    /// Statistic dimension `d` seen at training time
    pub fn input_dim(&self) -> usize {
        self.estimator().input_dim()
    }

    pub fn is_classifier(&self) -> bool {
        matches!(self, SurrogateModel::Classifier { .. })
    }
}

impl std::fmt::Debug for SurrogateModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurrogateModel::Classifier { estimator, n_models } => f
                .debug_struct("Classifier")
                .field("input_dim", &estimator.input_dim())
                .field("n_models", n_models)
                .finish(),
            SurrogateModel::Regressor { estimator, outputs } => f
                .debug_struct("Regressor")
                .field("input_dim", &estimator.input_dim())
                .field("outputs", outputs)
                .finish(),
        }
    }
}

/// Fits surrogates with a configured backend
#[derive(Debug, Clone, Default)]
pub struct SurrogateModelTrainer {
    backend: ModelBackend,
}

impl SurrogateModelTrainer {
    pub fn new(backend: ModelBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &ModelBackend {
        &self.backend
    }

    /// Train a classifier (comparison) or regressor (inference) on the table
    pub fn train(&self, table: &ReferenceTable, objective: &Objective) -> AbcResult<SurrogateModel> {
        let data = TrainingData::from_table(table, objective)?;
        info!(
            "Training {} surrogate on {} draws ({} statistics, objective: {})",
            self.backend.name(),
            data.len(),
            data.input_dim(),
            objective.kind()
        );

        let estimator = self.backend.fit(&data)?;
        Ok(match data.task() {
            Task::Classification { n_classes } => SurrogateModel::Classifier {
                estimator,
                n_models: n_classes,
            },
            Task::Regression { outputs } => SurrogateModel::Regressor { estimator, outputs },
        })
    }
}

/// Train a surrogate with the given backend
pub fn train(
    table: &ReferenceTable,
    objective: &Objective,
    backend: &ModelBackend,
) -> AbcResult<SurrogateModel> {
    SurrogateModelTrainer::new(backend.clone()).train(table, objective)
}
