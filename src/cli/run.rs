//! Run command - train, predict and report

use super::{load_config, load_observed, load_table, with_table_names, Overrides};
use abrox::pipeline::Pipeline;
use abrox::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;
use tracing::info;

pub(crate) struct RunArgs {
    pub table: PathBuf,
    pub observed: PathBuf,
    pub config: Option<PathBuf>,
    pub format: String,
    pub output: Option<PathBuf>,
    pub overrides: Overrides,
    pub cross_validate: bool,
}

pub(crate) fn run(args: RunArgs) -> Result<()> {
    let start = Instant::now();
    let format = OutputFormat::from_str(&args.format)?;

    let config = args.overrides.apply(load_config(args.config.as_deref())?)?;
    let table = load_table(&args.table)?;
    let observed = load_observed(&args.observed)?;
    let config = with_table_names(config, &table);
    let objective = config.objective()?;

    let mut pipeline = Pipeline::from_config(&config);
    if args.cross_validate {
        let mut validator = config.cross_validation.clone();
        validator.enabled = true;
        pipeline = pipeline.with_cross_validation(validator);
    }

    let output = pipeline
        .run(&table, &observed, &objective)
        .context("Inference run failed")?;
    info!("Run finished in {:.2?}: {}", start.elapsed(), output.summary());

    let rendered = reporters::render_with_format(&output, format)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
