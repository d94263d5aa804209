//! End-to-end tests through the public library API
//!
//! Each test builds its reference table in memory: two or three simulators
//! whose summary statistics sit in separate regions, or a parameterised
//! simulator whose statistics are a smooth function of its parameters.

use abrox::report::{BayesFactorCalculator, Report};
use abrox::surrogate::{EnsembleConfig, NetworkConfig};
use abrox::{
    predict, train, AbcConfig, AbcError, CrossValidator, Draw, ModelBackend, Objective,
    ObservedStatistics, Pipeline, Prediction, ReferenceTable,
};

/// Model `m` draws statistics around `(2m, -m)`, rows interleaved by model
fn model_table(n_models: usize, n_rows: usize) -> ReferenceTable {
    let rows = (0..n_rows)
        .map(|i| {
            let m = i % n_models;
            let jitter = ((i * 7919) % 13) as f64 / 13.0 - 0.5;
            Draw::model(m, vec![2.0 * m as f64 + 0.3 * jitter, -(m as f64) - 0.2 * jitter])
        })
        .collect();
    ReferenceTable::new(rows).unwrap()
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("M{i}")).collect()
}

fn network(seed: u64) -> ModelBackend {
    ModelBackend::NeuralNetwork(NetworkConfig {
        epochs: 20,
        seed: Some(seed),
        ..Default::default()
    })
}

#[test]
fn test_comparison_probabilities_sum_to_one() {
    let table = model_table(3, 90);
    let objective = Objective::Comparison {
        model_names: names(3),
    };
    let model = train(&table, &objective, &network(11)).unwrap();
    let prediction = predict(&model, &ObservedStatistics::new(vec![2.0, -1.0])).unwrap();

    match prediction {
        Prediction::ModelProbabilities(p) => {
            assert_eq!(p.len(), 3);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-6);
            assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
        other => panic!("expected model probabilities, got {other:?}"),
    }
}

#[test]
fn test_fixed_seed_reproduces_outputs() {
    let table = model_table(2, 60);
    let objective = Objective::Comparison {
        model_names: names(2),
    };
    let observed = ObservedStatistics::new(vec![1.0, -0.5]);

    let first = predict(&train(&table, &objective, &network(5)).unwrap(), &observed).unwrap();
    let second = predict(&train(&table, &objective, &network(5)).unwrap(), &observed).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_five_fold_partition_of_hundred_rows() {
    let validator = CrossValidator::new(5);
    let folds = validator.folds(100, None).unwrap();
    assert_eq!(folds.len(), 5);

    let mut seen = vec![false; 100];
    for fold in &folds {
        assert_eq!(fold.test.len(), 20);
        assert_eq!(fold.train.len(), 80);
        assert!(fold.test.iter().all(|t| !fold.train.contains(t)));
        for &t in &fold.test {
            assert!(!seen[t], "row {t} appears in two test folds");
            seen[t] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_cross_validation_reports_one_score_per_fold() {
    let table = model_table(2, 100);
    let objective = Objective::Comparison {
        model_names: names(2),
    };
    let backend = ModelBackend::TreeEnsemble(EnsembleConfig {
        trees: 10,
        max_depth: 3,
        ..Default::default()
    });
    let result = CrossValidator::new(5)
        .evaluate_table(&table, &objective, &backend)
        .unwrap();

    assert_eq!(result.per_fold.len(), 5);
    assert_eq!(result.fold_sizes, vec![20; 5]);
    assert!(result.per_fold.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(result.mean > 0.8, "separable models scored {}", result.mean);
}

#[test]
fn test_balanced_table_has_unit_bayes_factors() {
    let table = model_table(2, 50);
    let objective = Objective::Comparison {
        model_names: names(2),
    };
    let output = Pipeline::new(network(1))
        .run(&table, &ObservedStatistics::new(vec![0.0, 0.0]), &objective)
        .unwrap();

    let bf = output.report.bayes_factors().unwrap();
    assert_eq!(bf.get(0, 1), 1.0);
    assert_eq!(bf.get(1, 0), 1.0);
}

#[test]
fn test_unobserved_model_gives_infinite_odds() {
    let rows = (0..15)
        .map(|i| Draw::model(if i < 10 { 0 } else { 2 }, vec![i as f64]))
        .collect();
    let table = ReferenceTable::new(rows).unwrap();
    let matrix = BayesFactorCalculator.from_table(&table, &names(3)).unwrap();

    assert_eq!(matrix.get(1, 0), 0.0);
    assert_eq!(matrix.get(0, 1), f64::INFINITY);
    assert_eq!(matrix.get(2, 0), 0.5);
}

#[test]
fn test_inference_with_config() {
    let rows = (0..60)
        .map(|i| {
            let mu = (i % 20) as f64 / 10.0;
            let sigma = 0.5 + (i / 20) as f64 * 0.25;
            Draw::parameters(vec![mu, sigma], vec![mu, sigma * sigma, mu * sigma])
        })
        .collect();
    let table = ReferenceTable::new(rows).unwrap();
    let config = AbcConfig::from_toml_str(
        r#"
objective = "inference"
param_names = ["mu", "sigma"]

[backend]
kind = "tree_ensemble"

[backend.tree_ensemble]
trees = 30
max_depth = 4

[cross_validation]
enabled = true
folds = 3
shuffle = true
seed = 4
"#,
    )
    .unwrap();
    let objective = config.objective().unwrap();

    let output = abrox::run(
        &table,
        &ObservedStatistics::new(vec![1.0, 0.5625, 0.75]),
        &objective,
        &config,
    )
    .unwrap();

    match &output.report {
        Report::Inference {
            parameters,
            estimate,
        } => {
            let mu = parameters.get("mu").unwrap();
            assert_eq!(mu.count, 60);
            assert_eq!(mu.min, 0.0);
            assert_eq!(mu.max, 1.9);
            assert_eq!(estimate.len(), 2);
            assert_eq!(estimate[1].name, "sigma");
        }
        other => panic!("expected inference report, got {other:?}"),
    }
    let cv = output.cross_validation.as_ref().unwrap();
    assert_eq!(cv.fold_sizes, vec![20, 20, 20]);
    assert!(cv.mean.is_finite());
}

#[test]
fn test_observed_dimension_mismatch() {
    let table = model_table(2, 10);
    let objective = Objective::Comparison {
        model_names: names(2),
    };
    let model = train(&table, &objective, &network(2)).unwrap();
    let err = predict(&model, &ObservedStatistics::new(vec![1.0])).unwrap_err();
    assert_eq!(err, AbcError::shape("observed statistics", 2, 1));
}

#[test]
fn test_unsupported_objective_string() {
    assert_eq!(
        Objective::parse("regression", vec![], vec![]),
        Err(AbcError::UnsupportedObjective("regression".into()))
    );
}
