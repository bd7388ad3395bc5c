//! End-to-end training and classification checks on deterministic data.

use banyan_data::{Attribute, Dataset, Row, Schema, Value};
use banyan_forest::{Cascade, CascadeConfig, CartConfig, RandomForestConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A small iris-shaped problem: three classes, two informative
/// continuous attributes, fully separable.
fn three_class_dataset() -> Dataset {
    let schema = Schema::new(
        vec![
            Attribute::real("petal_length"),
            Attribute::real("petal_width"),
            Attribute::nominal(
                "species",
                vec!["setosa".into(), "versicolor".into(), "virginica".into()],
            ),
        ],
        2,
    )
    .unwrap();

    let mut rows = Vec::new();
    for i in 0..15 {
        let jitter = i as f64 * 0.02;
        rows.push(Row::new(vec![
            Value::Real(1.4 + jitter),
            Value::Real(0.2 + jitter),
            Value::Str("setosa".into()),
        ]));
        rows.push(Row::new(vec![
            Value::Real(4.3 + jitter),
            Value::Real(1.3 + jitter),
            Value::Str("versicolor".into()),
        ]));
        rows.push(Row::new(vec![
            Value::Real(5.8 + jitter),
            Value::Real(2.2 + jitter),
            Value::Str("virginica".into()),
        ]));
    }
    Dataset::from_rows(schema, rows).unwrap()
}

/// Imbalanced separable binary data with "0"/"1" classes.
fn binary_dataset() -> Dataset {
    let schema = Schema::new(
        vec![
            Attribute::real("x"),
            Attribute::real("y"),
            Attribute::nominal("class", vec!["0".into(), "1".into()]),
        ],
        2,
    )
    .unwrap();

    let mut rows = Vec::new();
    for i in 0..40 {
        rows.push(Row::new(vec![
            Value::Real(i as f64 * 0.1),
            Value::Real(0.0),
            Value::Str("0".into()),
        ]));
    }
    for i in 0..15 {
        rows.push(Row::new(vec![
            Value::Real(12.0 + i as f64 * 0.1),
            Value::Real(0.0),
            Value::Str("1".into()),
        ]));
    }
    Dataset::from_rows(schema, rows).unwrap()
}

#[test]
fn cart_reproduces_training_labels_on_separable_data() {
    let ds = three_class_dataset();
    let rows: Vec<Row> = ds.rows().to_vec();
    let labels = ds.class_strings();

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let tree = CartConfig::new().grow(ds, &mut rng).unwrap();

    // Separable data grows pure leaves, so classifying the training
    // set reproduces the labels exactly.
    for (row, label) in rows.iter().zip(&labels) {
        assert_eq!(tree.classify(row), label);
    }
}

#[test]
fn forest_oob_bookkeeping_full_run() {
    let ds = three_class_dataset();
    let config = RandomForestConfig::new()
        .with_n_trees(25)
        .with_percent_boot(66)
        .with_seed(42);
    let forest = config.fit(&ds).unwrap();

    assert_eq!(forest.n_trees(), 25);
    assert_eq!(forest.cmatrices().len(), 25);

    // Every per-tree OOB evaluation saw at least one sample.
    for cm in forest.cmatrices() {
        assert!(cm.n_samples() > 0);
        let total: usize = cm.rows().iter().flatten().sum();
        assert_eq!(total, cm.n_samples());
    }

    // The running OOB error mean stays a valid rate throughout.
    for mean in forest.oob_error_means() {
        assert!((0.0..=1.0).contains(mean), "mean = {mean}");
    }
}

#[test]
fn forest_feature_sweep_trains_at_every_width() {
    let ds = three_class_dataset();
    let n_features = ds.column_count() - 1;
    for nfeature in 1..=n_features {
        let config = RandomForestConfig::new()
            .with_n_trees(10)
            .with_n_random_feature(nfeature)
            .with_seed(42);
        let forest = config.fit(&ds).unwrap();
        assert_eq!(forest.n_trees(), 10, "nfeature = {nfeature}");
    }
}

#[test]
fn forest_test_set_classification() {
    let train = binary_dataset();
    let config = RandomForestConfig::new().with_n_trees(20).with_seed(42);
    let forest = config.fit(&train).unwrap();

    let mut test = binary_dataset();
    let cm = forest.classify_set(&mut test, &[], false);
    assert_eq!(cm.n_samples(), test.len());
    assert!(cm.true_rate() > 0.95, "true rate = {}", cm.true_rate());
    // Binary bookkeeping covers the whole set.
    assert_eq!(cm.tp() + cm.fn_(), 15);
    assert_eq!(cm.tn() + cm.fp(), 40);
}

#[test]
fn cascade_full_run_and_weighted_classification() {
    let mut train = binary_dataset();
    let n_before = train.len();

    let config = CascadeConfig::new()
        .with_n_stages(3)
        .with_n_trees(2)
        .with_seed(42);
    let cascade = Cascade::build(&config, &mut train).unwrap();

    assert_eq!(cascade.n_stages(), 3);
    assert_eq!(cascade.weights().len(), 3);
    // True negatives leave the training set between stages.
    assert!(train.len() <= n_before + cascade.n_stages());

    let test = binary_dataset();
    let (predictions, cm) = cascade.classify_set_by_weight(&test, &[]);
    assert_eq!(predictions.len(), test.len());
    assert!(cm.true_rate() > 0.85, "true rate = {}", cm.true_rate());
}
