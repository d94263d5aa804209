//! Error types for the inference engine
//!
//! Every fallible operation in the library returns [`AbcResult`]. The CLI
//! layer wraps these with `anyhow` context before printing them.

use thiserror::Error;

/// Errors that can occur while training, validating, predicting or reporting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AbcError {
    #[error("Reference table is empty: at least one simulated draw is required")]
    EmptyReferenceTable,

    #[error("Shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported objective '{0}'. Valid objectives: comparison, inference")]
    UnsupportedObjective(String),

    #[error("Row {row} has no '{field}' field, which this objective requires")]
    MissingField { row: usize, field: &'static str },

    #[error("Row {row} has model index {index}, but only {n_models} models are named")]
    InvalidModelIndex {
        row: usize,
        index: usize,
        n_models: usize,
    },

    #[error("Prediction does not match objective: expected {expected}, found {found}")]
    ObjectiveMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AbcError {
    /// Shorthand for a [`AbcError::ShapeMismatch`]
    pub fn shape(what: impl Into<String>, expected: usize, found: usize) -> Self {
        AbcError::ShapeMismatch {
            what: what.into(),
            expected,
            found,
        }
    }
}

pub type AbcResult<T> = Result<T, AbcError>;
