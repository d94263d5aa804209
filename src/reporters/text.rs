//! Text (terminal) reporter with colors and formatting

use crate::pipeline::RunOutput;
use crate::report::{BayesFactorMatrix, NamedValue, ParameterSummary, Report};
use crate::validation::CrossValidationResult;
use anyhow::Result;

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";

const RULE: &str = "──────────────────────────────────────";

/// Render a run result as formatted terminal output
pub fn render(output: &RunOutput) -> Result<String> {
    let mut out = String::new();

    match &output.report {
        Report::Comparison {
            bayes_factors,
            model_probabilities,
            posterior_odds,
        } => {
            out.push_str(&format!("\n{BOLD}abrox: model comparison{RESET}\n"));
            out.push_str(&format!("{DIM}{RULE}{RESET}\n"));
            out.push_str(&render_probabilities(model_probabilities));
            out.push('\n');
            out.push_str(&render_matrix("BAYES FACTORS", bayes_factors));
            out.push('\n');
            out.push_str(&render_matrix("POSTERIOR ODDS", posterior_odds));
        }
        Report::Inference {
            parameters,
            estimate,
        } => {
            out.push_str(&format!("\n{BOLD}abrox: parameter inference{RESET}\n"));
            out.push_str(&format!("{DIM}{RULE}{RESET}\n"));
            out.push_str(&format!("{BOLD}PARAMETER ESTIMATE{RESET}\n"));
            let width = name_width(estimate.iter().map(|e| e.name.as_str()));
            for e in estimate {
                out.push_str(&format!("  {:<width$}  {}\n", e.name, format_value(e.value)));
            }
            out.push('\n');
            out.push_str(&render_summary(parameters));
        }
    }

    if let Some(cv) = &output.cross_validation {
        out.push('\n');
        out.push_str(&render_cross_validation(cv));
    }

    Ok(out)
}

/// Model probabilities, the most probable model highlighted
fn render_probabilities(probabilities: &[NamedValue]) -> String {
    let mut out = format!("{BOLD}MODEL PROBABILITIES{RESET}\n");
    let best = probabilities
        .iter()
        .map(|p| p.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let width = name_width(probabilities.iter().map(|p| p.name.as_str()));

    for p in probabilities {
        let color = if p.value == best { GREEN } else { "" };
        out.push_str(&format!(
            "  {color}{:<width$}  {}{RESET}\n",
            p.name,
            format_value(p.value)
        ));
    }
    out
}

/// Labelled square matrix; cell (row, col) is the odds of row against col
pub fn render_matrix(title: &str, matrix: &BayesFactorMatrix) -> String {
    let mut out = format!("{BOLD}{title}{RESET} {DIM}(row vs column){RESET}\n");
    let label = name_width(matrix.model_names.iter().map(String::as_str));
    let cell = matrix
        .model_names
        .iter()
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0)
        .max(10);

    out.push_str(&format!("  {:<label$}", ""));
    for name in &matrix.model_names {
        out.push_str(&format!("  {name:>cell$}"));
    }
    out.push('\n');

    for (name, row) in matrix.model_names.iter().zip(&matrix.values) {
        out.push_str(&format!("  {name:<label$}"));
        for &v in row {
            out.push_str(&format!("  {:>cell$}", format_value(v)));
        }
        out.push('\n');
    }
    out
}

fn render_summary(summary: &ParameterSummary) -> String {
    let mut out = format!("{BOLD}PARAMETER SUMMARY{RESET} {DIM}(reference table){RESET}\n");
    let width = name_width(summary.parameters.iter().map(|s| s.name.as_str()));

    out.push_str(&format!("  {DIM}{:<width$}", ""));
    for header in ["count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
        out.push_str(&format!("  {header:>10}"));
    }
    out.push_str(&format!("{RESET}\n"));

    for s in &summary.parameters {
        out.push_str(&format!("  {:<width$}  {:>10}", s.name, s.count));
        for v in [s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max] {
            out.push_str(&format!("  {:>10}", format_value(v)));
        }
        out.push('\n');
    }
    out
}

/// Fold scores and their mean
pub fn render_cross_validation(result: &CrossValidationResult) -> String {
    let mut out = format!("{BOLD}CROSS-VALIDATION{RESET}\n");
    out.push_str(&format!(
        "  {}: {BOLD}{}{RESET} ± {} ({} folds)\n",
        result.metric,
        format_value(result.mean),
        format_value(result.std_dev),
        result.per_fold.len()
    ));
    for (i, (score, size)) in result.per_fold.iter().zip(&result.fold_sizes).enumerate() {
        out.push_str(&format!(
            "  {DIM}fold {}: {} ({} rows){RESET}\n",
            i + 1,
            format_value(*score),
            size
        ));
    }
    out
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(|n| n.chars().count()).max().unwrap_or(0)
}

/// Four decimals, with `inf` / `NaN` spelled out
fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{v:.4}")
    }
}
