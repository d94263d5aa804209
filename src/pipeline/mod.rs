//! Inference pipeline
//!
//! Orchestrates one full run:
//! 1. Train the surrogate on the reference table
//! 2. Cross-validate the backend (if enabled)
//! 3. Predict for the observed statistics
//! 4. Assemble the report

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AbcConfig;
use crate::error::{AbcError, AbcResult};
use crate::models::{ObservedStatistics, Objective, ReferenceTable};
use crate::predict::Predictor;
use crate::report::{Report, ReportGenerator};
use crate::surrogate::{ModelBackend, SurrogateModelTrainer};
use crate::validation::{CrossValidationResult, CrossValidator};

/// Full inference pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    trainer: SurrogateModelTrainer,
    /// Cross-validation settings, when the run should score the backend
    cross_validation: Option<CrossValidator>,
    generator: ReportGenerator,
}

impl Pipeline {
    /// Create a pipeline for a backend, without cross-validation.
    pub fn new(backend: ModelBackend) -> Self {
        Self {
            trainer: SurrogateModelTrainer::new(backend),
            cross_validation: None,
            generator: ReportGenerator::new(),
        }
    }

    /// Create a pipeline from a loaded config.
    pub fn from_config(config: &AbcConfig) -> Self {
        let pipeline = Self::new(config.backend());
        if config.cross_validation.enabled {
            pipeline.with_cross_validation(config.cross_validation.clone())
        } else {
            pipeline
        }
    }

    /// Score the backend with k-fold cross-validation during the run.
    pub fn with_cross_validation(mut self, validator: CrossValidator) -> Self {
        self.cross_validation = Some(validator);
        self
    }

    pub fn without_cross_validation(mut self) -> Self {
        self.cross_validation = None;
        self
    }

    pub fn backend(&self) -> &ModelBackend {
        self.trainer.backend()
    }

    /// Run the pipeline on a reference table and one observed dataset.
    pub fn run(
        &self,
        table: &ReferenceTable,
        observed: &ObservedStatistics,
        objective: &Objective,
    ) -> AbcResult<RunOutput> {
        if table.is_empty() {
            return Err(AbcError::EmptyReferenceTable);
        }
        // Fail before training rather than after it
        if observed.len() != table.stat_dim() {
            return Err(AbcError::shape(
                "observed statistics",
                table.stat_dim(),
                observed.len(),
            ));
        }

        info!(
            "Running {} on {} draws with {} backend",
            objective.kind(),
            table.len(),
            self.backend().name()
        );

        let model = self.trainer.train(table, objective)?;
        debug!("Trained surrogate: {:?}", model);

        let cross_validation = match &self.cross_validation {
            Some(validator) => Some(validator.evaluate_table(table, objective, self.backend())?),
            None => None,
        };

        let prediction = Predictor.predict(&model, observed)?;
        let report = self.generator.report(objective, table, &prediction)?;

        Ok(RunOutput {
            report,
            cross_validation,
        })
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    pub report: Report,
    /// Fold scores (if cross-validation was enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_validation: Option<CrossValidationResult>,
}

impl RunOutput {
    pub fn has_cross_validation(&self) -> bool {
        self.cross_validation.is_some()
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let mut parts = vec![match &self.report {
            Report::Comparison {
                model_probabilities,
                ..
            } => format!("{} models compared", model_probabilities.len()),
            Report::Inference { estimate, .. } => format!("{} parameters estimated", estimate.len()),
        }];

        if let Some(ref cv) = self.cross_validation {
            parts.push(format!(
                "cv: {} folds, {} {:.4} ± {:.4}",
                cv.per_fold.len(),
                cv.metric,
                cv.mean,
                cv.std_dev
            ));
        }

        parts.join(", ")
    }
}

/// Train, optionally cross-validate, predict and report in one call.
pub fn run(
    table: &ReferenceTable,
    observed: &ObservedStatistics,
    objective: &Objective,
    config: &AbcConfig,
) -> AbcResult<RunOutput> {
    Pipeline::from_config(config).run(table, observed, objective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Draw;
    use crate::surrogate::EnsembleConfig;

    fn two_cluster_table(n: usize) -> ReferenceTable {
        let rows = (0..n)
            .map(|i| {
                let jitter = (i % 7) as f64 * 0.05;
                if i % 2 == 0 {
                    Draw::model(0, vec![-1.0 - jitter, 0.5 + jitter])
                } else {
                    Draw::model(1, vec![1.0 + jitter, -0.5 - jitter])
                }
            })
            .collect();
        ReferenceTable::new(rows).unwrap()
    }

    fn comparison() -> Objective {
        Objective::Comparison {
            model_names: vec!["M0".into(), "M1".into()],
        }
    }

    fn trees() -> ModelBackend {
        ModelBackend::TreeEnsemble(EnsembleConfig {
            trees: 20,
            max_depth: 3,
            ..Default::default()
        })
    }

    #[test]
    fn test_pipeline_creation() {
        let config = AbcConfig::default();
        let pipeline = Pipeline::from_config(&config);
        assert!(pipeline.cross_validation.is_none());
        assert_eq!(pipeline.backend().name(), "neural_network");

        let mut config = AbcConfig::default();
        config.cross_validation.enabled = true;
        let pipeline = Pipeline::from_config(&config);
        assert!(pipeline.cross_validation.is_some());
        assert!(pipeline.without_cross_validation().cross_validation.is_none());
    }

    #[test]
    fn test_comparison_run() {
        let table = two_cluster_table(40);
        let observed = ObservedStatistics::new(vec![1.1, -0.6]);
        let output = Pipeline::new(trees())
            .run(&table, &observed, &comparison())
            .unwrap();

        assert!(!output.has_cross_validation());
        match &output.report {
            Report::Comparison {
                bayes_factors,
                model_probabilities,
                ..
            } => {
                assert_eq!(bayes_factors.get(0, 1), 1.0);
                let total: f64 = model_probabilities.iter().map(|p| p.value).sum();
                assert!((total - 1.0).abs() < 1e-6);
                assert!(model_probabilities[1].value > model_probabilities[0].value);
            }
            other => panic!("expected comparison report, got {other:?}"),
        }
        assert!(output.summary().contains("2 models compared"));
    }

    #[test]
    fn test_run_with_cross_validation() {
        let table = two_cluster_table(40);
        let observed = ObservedStatistics::new(vec![-1.0, 0.5]);
        let output = Pipeline::new(trees())
            .with_cross_validation(CrossValidator::new(4))
            .run(&table, &observed, &comparison())
            .unwrap();

        let cv = output.cross_validation.as_ref().unwrap();
        assert_eq!(cv.per_fold.len(), 4);
        assert_eq!(cv.fold_sizes, vec![10, 10, 10, 10]);
        assert!(output.summary().contains("cv: 4 folds"));
    }

    #[test]
    fn test_observed_dimension_checked_before_training() {
        let table = two_cluster_table(10);
        let observed = ObservedStatistics::new(vec![0.0, 0.0, 0.0]);
        let err = Pipeline::new(trees())
            .run(&table, &observed, &comparison())
            .unwrap_err();
        assert_eq!(err, AbcError::shape("observed statistics", 2, 3));
    }

    #[test]
    fn test_inference_run_from_config() {
        let rows = (0..30)
            .map(|i| {
                let theta = i as f64 / 30.0;
                Draw::parameters(vec![theta], vec![2.0 * theta, theta * theta])
            })
            .collect();
        let table = ReferenceTable::new(rows).unwrap();
        let config = AbcConfig::from_toml_str(
            "objective = \"inference\"\nparam_names = [\"theta\"]\n[backend]\nkind = \"tree_ensemble\"\n",
        )
        .unwrap();
        let objective = config.objective().unwrap();

        let output = run(
            &table,
            &ObservedStatistics::new(vec![1.0, 0.25]),
            &objective,
            &config,
        )
        .unwrap();
        match output.report {
            Report::Inference {
                parameters,
                estimate,
            } => {
                assert_eq!(parameters.get("theta").unwrap().count, 30);
                assert_eq!(estimate.len(), 1);
                assert!((estimate[0].value - 0.5).abs() < 0.2);
            }
            other => panic!("expected inference report, got {other:?}"),
        }
    }
}
