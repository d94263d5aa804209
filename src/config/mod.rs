//! Run configuration (abrox.toml)
//!
//! Example:
//! ```toml
//! objective = "comparison"
//! model_names = ["M0", "M1"]
//!
//! [backend]
//! kind = "tree_ensemble"
//!
//! [backend.tree_ensemble]
//! trees = 50
//!
//! [cross_validation]
//! enabled = true
//! folds = 5
//! ```
//!
//! Every section is optional and falls back to its defaults. Reading the
//! file from disk is left to the caller; this module only parses.

use crate::error::{AbcError, AbcResult};
use crate::models::Objective;
use crate::surrogate::{EnsembleConfig, ModelBackend, NetworkConfig};
use crate::validation::CrossValidator;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "abrox.toml";

/// Config file written by `abrox init`
pub const EXAMPLE_CONFIG: &str = r#"# abrox configuration

# "comparison" (model selection) or "inference" (parameter estimation)
objective = "comparison"

# One name per model index, used to label the Bayes factor matrix
model_names = ["M0", "M1"]

# One name per parameter, used for inference reports
param_names = []

[backend]
# "neural_network" or "tree_ensemble"
kind = "neural_network"

[backend.neural_network]
hidden_layers = [10, 10]
epochs = 10
batch_size = 64
learning_rate = 0.001
# validation_split = 0.2
# seed = 42

[backend.tree_ensemble]
trees = 100
max_depth = 6
learning_rate = 0.1
min_leaf_size = 1

[cross_validation]
enabled = false
folds = 5
shuffle = false
stratify = false
"#;

/// Surrogate model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    NeuralNetwork,
    TreeEnsemble,
}

impl FromStr for BackendKind {
    type Err = AbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "neural_network" | "nn" => Ok(BackendKind::NeuralNetwork),
            "tree_ensemble" | "gbdt" => Ok(BackendKind::TreeEnsemble),
            _ => Err(AbcError::InvalidConfig(format!(
                "unknown backend '{s}'. Valid backends: neural_network, tree_ensemble"
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::NeuralNetwork => write!(f, "neural_network"),
            BackendKind::TreeEnsemble => write!(f, "tree_ensemble"),
        }
    }
}

/// `[backend]` section: the selected family plus settings for each
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    pub neural_network: NetworkConfig,
    pub tree_ensemble: EnsembleConfig,
}

/// Full run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcConfig {
    /// "comparison" or "inference"; validated by [`AbcConfig::objective`]
    pub objective: String,
    pub model_names: Vec<String>,
    pub param_names: Vec<String>,
    pub backend: BackendSection,
    pub cross_validation: CrossValidator,
}

impl Default for AbcConfig {
    fn default() -> Self {
        Self {
            objective: "comparison".to_string(),
            model_names: Vec::new(),
            param_names: Vec::new(),
            backend: BackendSection::default(),
            cross_validation: CrossValidator::default(),
        }
    }
}

impl AbcConfig {
    pub fn from_toml_str(content: &str) -> AbcResult<Self> {
        toml::from_str(content).map_err(|e| AbcError::InvalidConfig(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> AbcResult<Self> {
        serde_json::from_str(content).map_err(|e| AbcError::InvalidConfig(e.to_string()))
    }

    /// The tagged objective, carrying the names that belong to it
    pub fn objective(&self) -> AbcResult<Objective> {
        Objective::parse(
            &self.objective,
            self.model_names.clone(),
            self.param_names.clone(),
        )
    }

    /// The configured model family with its hyper-parameters
    pub fn backend(&self) -> ModelBackend {
        match self.backend.kind {
            BackendKind::NeuralNetwork => {
                ModelBackend::NeuralNetwork(self.backend.neural_network.clone())
            }
            BackendKind::TreeEnsemble => {
                ModelBackend::TreeEnsemble(self.backend.tree_ensemble.clone())
            }
        }
    }

    /// Fix every seed in the config (network training and fold shuffling)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.backend.neural_network.seed = Some(seed);
        self.cross_validation.seed = Some(seed);
        self
    }

    /// Fill in model names `M0..M{n-1}` when none are configured
    pub fn with_default_model_names(mut self, n_models: usize) -> Self {
        if self.model_names.is_empty() {
            self.model_names = (0..n_models).map(|i| format!("M{i}")).collect();
        }
        self
    }

    /// Fill in parameter names `theta0..theta{p-1}` when none are configured
    pub fn with_default_param_names(mut self, n_params: usize) -> Self {
        if self.param_names.is_empty() {
            self.param_names = (0..n_params).map(|i| format!("theta{i}")).collect();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = AbcConfig::from_toml_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.model_names, vec!["M0", "M1"]);
        assert_eq!(config.backend.kind, BackendKind::NeuralNetwork);
        assert_eq!(config.backend.neural_network, NetworkConfig::default());
        assert_eq!(config.backend.tree_ensemble, EnsembleConfig::default());
        assert_eq!(config.cross_validation, CrossValidator::default());
        assert_eq!(
            config.objective().unwrap(),
            Objective::Comparison {
                model_names: vec!["M0".into(), "M1".into()]
            }
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = AbcConfig::from_toml_str("objective = \"inference\"\nparam_names = [\"mu\"]\n")
            .unwrap();
        assert_eq!(config.backend, BackendSection::default());
        assert!(!config.cross_validation.enabled);
        assert_eq!(config.cross_validation.folds, 5);
        assert!(matches!(config.backend(), ModelBackend::NeuralNetwork(_)));
        assert_eq!(
            config.objective().unwrap(),
            Objective::Inference {
                param_names: vec!["mu".into()]
            }
        );
    }

    #[test]
    fn test_tree_backend_selected() {
        let toml = r#"
model_names = ["a", "b", "c"]

[backend]
kind = "tree_ensemble"

[backend.tree_ensemble]
trees = 20
max_depth = 3

[cross_validation]
enabled = true
folds = 3
stratify = true
"#;
        let config = AbcConfig::from_toml_str(toml).unwrap();
        match config.backend() {
            ModelBackend::TreeEnsemble(cfg) => {
                assert_eq!(cfg.trees, 20);
                assert_eq!(cfg.max_depth, 3);
                assert_eq!(cfg.min_leaf_size, 1);
            }
            other => panic!("expected tree ensemble, got {other:?}"),
        }
        assert!(config.cross_validation.enabled);
        assert!(config.cross_validation.stratify);
        assert_eq!(config.cross_validation.folds, 3);
    }

    #[test]
    fn test_unsupported_objective() {
        let config = AbcConfig::from_toml_str("objective = \"selection\"").unwrap();
        assert_eq!(
            config.objective(),
            Err(AbcError::UnsupportedObjective("selection".into()))
        );
    }

    #[test]
    fn test_json_config() {
        let json = r#"{"objective": "comparison", "model_names": ["x", "y"], "backend": {"kind": "tree_ensemble"}}"#;
        let config = AbcConfig::from_json_str(json).unwrap();
        assert_eq!(config.backend.kind, BackendKind::TreeEnsemble);
        assert_eq!(config.model_names.len(), 2);
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            AbcConfig::from_toml_str("objective = ["),
            Err(AbcError::InvalidConfig(_))
        ));
        assert!(matches!(
            AbcConfig::from_toml_str("[backend]\nkind = \"svm\""),
            Err(AbcError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_seed_and_default_names() {
        let config = AbcConfig::default()
            .with_seed(9)
            .with_default_model_names(3)
            .with_default_param_names(2);
        assert_eq!(config.backend.neural_network.seed, Some(9));
        assert_eq!(config.cross_validation.seed, Some(9));
        assert_eq!(config.model_names, vec!["M0", "M1", "M2"]);
        assert_eq!(config.param_names, vec!["theta0", "theta1"]);

        let named = AbcConfig {
            model_names: vec!["keep".into()],
            ..Default::default()
        }
        .with_default_model_names(4);
        assert_eq!(named.model_names, vec!["keep"]);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("tree-ensemble".parse::<BackendKind>(), Ok(BackendKind::TreeEnsemble));
        assert_eq!("NN".parse::<BackendKind>(), Ok(BackendKind::NeuralNetwork));
        assert!("forest".parse::<BackendKind>().is_err());
    }
}
