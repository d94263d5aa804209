//! CLI contract tests
//!
//! Runs the built binary against reference tables written to a temp
//! directory and checks exit codes and output formats.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn abrox_bin() -> String {
    env!("CARGO_BIN_EXE_abrox").to_string()
}

/// Run abrox in `dir` and return (stdout, stderr, exit_code)
fn run_abrox(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(abrox_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("ABROX_CONFIG")
        .output()
        .expect("Failed to execute abrox binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Two well separated models, 40 draws each, plus an observed vector near model 1
fn setup_comparison() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<String> = (0..80)
        .map(|i| {
            let m = i % 2;
            let x = m as f64 * 3.0 + (i % 5) as f64 * 0.1;
            format!(r#"{{"idx": {m}, "sumstat": [{x}, {}]}}"#, 1.0 - x)
        })
        .collect();
    std::fs::write(dir.path().join("table.json"), format!("[{}]", rows.join(","))).unwrap();
    std::fs::write(dir.path().join("observed.json"), "[3.1, -2.1]").unwrap();
    dir
}

fn setup_inference() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<String> = (0..40)
        .map(|i| {
            let theta = i as f64 / 40.0;
            format!(r#"{{"param": [{theta}], "sumstat": [{}, {}]}}"#, 2.0 * theta, theta * theta)
        })
        .collect();
    std::fs::write(dir.path().join("table.json"), format!("[{}]", rows.join(","))).unwrap();
    std::fs::write(dir.path().join("observed.json"), "[1.0, 0.25]").unwrap();
    std::fs::write(
        dir.path().join("abrox.toml"),
        "objective = \"inference\"\nparam_names = [\"theta\"]\n\n[backend]\nkind = \"tree_ensemble\"\n",
    )
    .unwrap();
    dir
}

#[test]
fn test_run_json_comparison() {
    let dir = setup_comparison();
    let (stdout, stderr, code) = run_abrox(
        dir.path(),
        &[
            "run", "--table", "table.json", "--observed", "observed.json", "--format", "json",
            "--backend", "tree_ensemble",
        ],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["report"]["objective"], "comparison");
    assert_eq!(parsed["report"]["bayes_factors"]["model_names"][0], "M0");
    assert_eq!(parsed["report"]["bayes_factors"]["values"][0][1], 1.0);

    let probs = parsed["report"]["model_probabilities"].as_array().unwrap();
    let total: f64 = probs.iter().map(|p| p["value"].as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert!(parsed.get("cross_validation").is_none());
}

#[test]
fn test_run_with_cross_validation_text() {
    let dir = setup_comparison();
    let (stdout, stderr, code) = run_abrox(
        dir.path(),
        &[
            "run", "--table", "table.json", "--observed", "observed.json", "--cross-validate",
            "--seed", "7",
        ],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("BAYES FACTORS"));
    assert!(stdout.contains("CROSS-VALIDATION"));
    assert!(stdout.contains("accuracy"));
}

#[test]
fn test_run_inference_uses_local_config() {
    let dir = setup_inference();
    let (stdout, stderr, code) = run_abrox(
        dir.path(),
        &["run", "-t", "table.json", "--observed", "observed.json", "-f", "json"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["report"]["objective"], "inference");
    assert_eq!(parsed["report"]["estimate"][0]["name"], "theta");
    assert_eq!(parsed["report"]["parameters"]["parameters"][0]["count"], 40);
}

#[test]
fn test_run_output_file() {
    let dir = setup_inference();
    let (_, stderr, code) = run_abrox(
        dir.path(),
        &["run", "-t", "table.json", "--observed", "observed.json", "-o", "report.txt"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
    let written = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert!(written.contains("PARAMETER SUMMARY"));
}

#[test]
fn test_bayes_factor_command() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = Vec::new();
    for (idx, count) in [(0, 10), (2, 5)] {
        for _ in 0..count {
            rows.push(format!(r#"{{"idx": {idx}, "sumstat": [0.0]}}"#));
        }
    }
    std::fs::write(dir.path().join("table.json"), format!("[{}]", rows.join(","))).unwrap();

    let (stdout, stderr, code) =
        run_abrox(dir.path(), &["bayes-factor", "--table", "table.json", "--format", "json"]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["model_names"].as_array().unwrap().len(), 3);
    assert_eq!(parsed["values"][1][0], 0.0);
    assert_eq!(parsed["values"][0][1], "inf");
    assert_eq!(parsed["values"][2][1], "inf");
    assert_eq!(parsed["values"][2][0], 0.5);

    let (text, _, code) = run_abrox(dir.path(), &["bayes-factor", "--table", "table.json"]);
    assert_eq!(code, 0);
    assert!(text.contains("inf"));
}

#[test]
fn test_cross_validate_command() {
    let dir = setup_comparison();
    let (stdout, stderr, code) = run_abrox(
        dir.path(),
        &[
            "cross-validate", "--table", "table.json", "--folds", "4", "--stratify",
            "--backend", "tree_ensemble", "--format", "json",
        ],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["metric"], "accuracy");
    assert_eq!(parsed["per_fold"].as_array().unwrap().len(), 4);
    assert_eq!(parsed["fold_sizes"], serde_json::json!([20, 20, 20, 20]));
}

#[test]
fn test_invalid_inputs_fail() {
    let dir = setup_comparison();

    // observed vector has the wrong length
    std::fs::write(dir.path().join("short.json"), "[1.0]").unwrap();
    let (_, stderr, code) = run_abrox(
        dir.path(),
        &["run", "--table", "table.json", "--observed", "short.json"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Shape mismatch"), "stderr: {stderr}");

    let (_, stderr, code) = run_abrox(
        dir.path(),
        &[
            "run", "--table", "table.json", "--observed", "observed.json", "--objective",
            "selection",
        ],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Unsupported objective"), "stderr: {stderr}");

    let (_, _, code) = run_abrox(dir.path(), &["cross-validate", "--table", "table.json", "-k", "1"]);
    assert_ne!(code, 0);

    let (_, _, code) = run_abrox(dir.path(), &["run", "--table", "missing.json", "--observed", "observed.json"]);
    assert_ne!(code, 0);
}

#[test]
fn test_init_writes_config() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_abrox(dir.path(), &["init"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Created"));

    let written = std::fs::read_to_string(dir.path().join("abrox.toml")).unwrap();
    assert!(written.contains("[cross_validation]"));

    let (stdout, _, code) = run_abrox(dir.path(), &["init"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("already exists"));
}
