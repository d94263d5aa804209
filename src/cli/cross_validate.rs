//! Cross-validate command - score a backend without a final prediction

use super::{load_config, load_table, with_table_names, Overrides};
use abrox::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub(crate) struct CrossValidateArgs {
    pub table: PathBuf,
    pub config: Option<PathBuf>,
    pub folds: Option<usize>,
    pub shuffle: bool,
    pub stratify: bool,
    pub overrides: Overrides,
    pub format: String,
}

pub(crate) fn run(args: CrossValidateArgs) -> Result<()> {
    let format = OutputFormat::from_str(&args.format)?;

    let config = args.overrides.apply(load_config(args.config.as_deref())?)?;
    let table = load_table(&args.table)?;
    let config = with_table_names(config, &table);
    let objective = config.objective()?;

    let mut validator = config.cross_validation.clone();
    if let Some(k) = args.folds {
        validator.folds = k;
    }
    validator.shuffle |= args.shuffle;
    validator.stratify |= args.stratify;

    let result = validator
        .evaluate_table(&table, &objective, &config.backend())
        .context("Cross-validation failed")?;

    println!("{}", reporters::render_cross_validation(&result, format)?);
    Ok(())
}
