//! Bayes-factor command - count-based model odds, no training

use super::{load_config, load_table, with_table_names};
use abrox::report::BayesFactorCalculator;
use abrox::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;

pub(crate) fn run(table: &Path, config: Option<&Path>, format: &str) -> Result<()> {
    let format = OutputFormat::from_str(format)?;

    let table = load_table(table)?;
    let config = with_table_names(load_config(config)?, &table);

    let matrix = BayesFactorCalculator
        .from_table(&table, &config.model_names)
        .context("Failed to compute Bayes factors")?;

    println!("{}", reporters::render_bayes_factors(&matrix, format)?);
    Ok(())
}
