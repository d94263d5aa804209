//! CLI command definitions and handlers

mod bayes_factor;
mod cross_validate;
mod init;
mod run;

use abrox::config::{AbcConfig, CONFIG_FILE_NAME};
use abrox::models::{ObjectiveKind, ObservedStatistics, ReferenceTable};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parse and validate a fold count (2-100)
fn parse_folds(s: &str) -> Result<usize, String> {
    let k: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if k < 2 {
        Err("folds must be at least 2".to_string())
    } else if k > 100 {
        Err("folds cannot exceed 100".to_string())
    } else {
        Ok(k)
    }
}

/// abrox - Approximate Bayesian Computation with surrogate models
#[derive(Parser, Debug)]
#[command(name = "abrox")]
#[command(
    version,
    about = "Approximate Bayesian Computation with surrogate models: Bayes factors and parameter inference from simulated reference tables",
    after_help = "\
Examples:
  abrox init                                          Write an example abrox.toml
  abrox run --table ref.json --observed obs.json      Train, predict and report
  abrox run --table ref.json --observed obs.json --format json
  abrox cross-validate --table ref.json --folds 10    Score the configured backend
  abrox bayes-factor --table ref.json                 Count-based Bayes factors only"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an abrox.toml config file with example settings
    Init {
        /// Directory to write the config into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Train a surrogate, apply it to the observed data and report
    #[command(after_help = "\
Examples:
  abrox run --table ref.json --observed obs.json
  abrox run --table ref.json --observed obs.json --config abrox.toml --cross-validate
  abrox run --table ref.json --observed obs.json --backend tree_ensemble --seed 42")]
    Run {
        /// Reference table: JSON array of draws with idx/param/sumstat
        #[arg(long, short = 't')]
        table: PathBuf,

        /// Observed summary statistics: JSON array of numbers
        #[arg(long)]
        observed: PathBuf,

        /// Config file (default: ./abrox.toml if present)
        #[arg(long, short = 'c', env = "ABROX_CONFIG")]
        config: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Override the configured objective (comparison, inference)
        #[arg(long)]
        objective: Option<String>,

        /// Override the configured backend (neural_network, tree_ensemble)
        #[arg(long)]
        backend: Option<String>,

        /// Cross-validate the backend as part of the run
        #[arg(long)]
        cross_validate: bool,

        /// Seed for network training and fold shuffling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score the configured backend with k-fold cross-validation
    CrossValidate {
        /// Reference table: JSON array of draws with idx/param/sumstat
        #[arg(long, short = 't')]
        table: PathBuf,

        /// Config file (default: ./abrox.toml if present)
        #[arg(long, short = 'c', env = "ABROX_CONFIG")]
        config: Option<PathBuf>,

        /// Number of folds (overrides config)
        #[arg(long, short = 'k', value_parser = parse_folds)]
        folds: Option<usize>,

        /// Shuffle rows before partitioning
        #[arg(long)]
        shuffle: bool,

        /// Keep class proportions equal across folds (comparison only)
        #[arg(long)]
        stratify: bool,

        /// Override the configured objective (comparison, inference)
        #[arg(long)]
        objective: Option<String>,

        /// Override the configured backend (neural_network, tree_ensemble)
        #[arg(long)]
        backend: Option<String>,

        /// Seed for network training and fold shuffling
        #[arg(long)]
        seed: Option<u64>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Bayes factors from the reference table's model counts (no training)
    BayesFactor {
        /// Reference table: JSON array of draws with idx/sumstat
        #[arg(long, short = 't')]
        table: PathBuf,

        /// Config file providing model names (default: ./abrox.toml if present)
        #[arg(long, short = 'c', env = "ABROX_CONFIG")]
        config: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => init::run(&path, force),

        Commands::Run {
            table,
            observed,
            config,
            format,
            output,
            objective,
            backend,
            cross_validate,
            seed,
        } => run::run(run::RunArgs {
            table,
            observed,
            config,
            format,
            output,
            overrides: Overrides {
                objective,
                backend,
                seed,
            },
            cross_validate,
        }),

        Commands::CrossValidate {
            table,
            config,
            folds,
            shuffle,
            stratify,
            objective,
            backend,
            seed,
            format,
        } => cross_validate::run(cross_validate::CrossValidateArgs {
            table,
            config,
            folds,
            shuffle,
            stratify,
            overrides: Overrides {
                objective,
                backend,
                seed,
            },
            format,
        }),

        Commands::BayesFactor {
            table,
            config,
            format,
        } => bayes_factor::run(&table, config.as_deref(), &format),
    }
}

/// Command-line overrides applied on top of the config file
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub objective: Option<String>,
    pub backend: Option<String>,
    pub seed: Option<u64>,
}

impl Overrides {
    fn apply(self, mut config: AbcConfig) -> Result<AbcConfig> {
        if let Some(objective) = self.objective {
            // Validate early so a typo fails before any file is read
            objective.parse::<ObjectiveKind>()?;
            config.objective = objective;
        }
        if let Some(backend) = self.backend {
            config.backend.kind = backend.parse()?;
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}

/// Load the config from an explicit path, or ./abrox.toml, or defaults
pub(crate) fn load_config(path: Option<&Path>) -> Result<AbcConfig> {
    if let Some(path) = path {
        let config = load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        return Ok(config);
    }

    let default_path = Path::new(CONFIG_FILE_NAME);
    if default_path.exists() {
        match load_config_file(default_path) {
            Ok(config) => {
                debug!("Loaded config from {}", default_path.display());
                return Ok(config);
            }
            Err(e) => {
                warn!("Failed to load {}: {}", default_path.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    Ok(AbcConfig::default())
}

/// Parse a config file as TOML, or JSON when the extension says so
fn load_config_file(path: &Path) -> Result<AbcConfig> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let config = if is_json {
        AbcConfig::from_json_str(&content)?
    } else {
        AbcConfig::from_toml_str(&content)?
    };
    Ok(config)
}

pub(crate) fn load_table(path: &Path) -> Result<ReferenceTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read reference table {}", path.display()))?;
    let table: ReferenceTable = serde_json::from_str(&content)
        .with_context(|| format!("Invalid reference table {}", path.display()))?;
    debug!(
        "Loaded {} draws ({} statistics) from {}",
        table.len(),
        table.stat_dim(),
        path.display()
    );
    Ok(table)
}

pub(crate) fn load_observed(path: &Path) -> Result<ObservedStatistics> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read observed statistics {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid observed statistics {}", path.display()))
}

/// Fill in names the config left empty from the table's shape
pub(crate) fn with_table_names(config: AbcConfig, table: &ReferenceTable) -> AbcConfig {
    let n_models = table
        .rows()
        .iter()
        .filter_map(|r| r.model_index)
        .max()
        .map(|m| m + 1)
        .unwrap_or(0);
    config
        .with_default_model_names(n_models)
        .with_default_param_names(table.param_dim().unwrap_or(0))
}
