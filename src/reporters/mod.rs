//! Output reporters for abrox run results
//!
//! Supports multiple output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::pipeline::RunOutput;
use crate::report::BayesFactorMatrix;
use crate::validation::CrossValidationResult;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a run result in the specified format
pub fn render(output: &RunOutput, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    render_with_format(output, fmt)
}

/// Render a run result using an OutputFormat enum
pub fn render_with_format(output: &RunOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(output),
        OutputFormat::Json => json::render(output),
    }
}

/// Render a standalone Bayes factor matrix
pub fn render_bayes_factors(matrix: &BayesFactorMatrix, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_matrix("BAYES FACTORS", matrix)),
        OutputFormat::Json => json::render(matrix),
    }
}

/// Render a standalone cross-validation result
pub fn render_cross_validation(
    result: &CrossValidationResult,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_cross_validation(result)),
        OutputFormat::Json => json::render(result),
    }
}
