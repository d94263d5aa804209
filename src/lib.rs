//! abrox - Approximate Bayesian Computation with surrogate models
//!
//! Trains a classifier or regressor on a simulated reference table, applies
//! it to observed summary statistics and reports either Bayes factors
//! between candidate models or a summary of the inferred parameters.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod predict;
pub mod report;
pub mod reporters;
pub mod surrogate;
pub mod validation;

pub use config::AbcConfig;
pub use error::{AbcError, AbcResult};
pub use models::{Draw, Objective, ObservedStatistics, Prediction, ReferenceTable};
pub use pipeline::{run, Pipeline, RunOutput};
pub use predict::predict;
pub use surrogate::{train, ModelBackend, SurrogateModel};
pub use validation::{CrossValidationResult, CrossValidator};
