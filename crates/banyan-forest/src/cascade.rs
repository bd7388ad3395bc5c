//! Cascaded Random Forest: staged forests with per-stage reweighting.
//!
//! Each stage trains a small forest, stops growing trees early once the
//! last tree clears the TP/TN rate thresholds, then reshapes the
//! training set (true negatives leave, false positives are duplicated)
//! before the next stage. Classification is a weighted vote across
//! stages, each stage weighted by exp(F-measure) of its final tree.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use banyan_data::{Dataset, Row};

use crate::config::CascadeConfig;
use crate::confusion::ConfusionMatrix;
use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::stats::{Stat, StatWriter};

/// A fitted cascade: one forest and one weight per stage.
#[derive(Debug)]
pub struct Cascade {
    n_trees_per_stage: usize,
    forests: Vec<RandomForest>,
    weights: Vec<f64>,
    stats: Vec<Stat>,
}

impl Cascade {
    /// Train a cascade on `samples`.
    ///
    /// The sample set is mutated between stages: rows the stage's last
    /// tree judged true-negative are deleted, rows judged false-positive
    /// are cloned and appended. Both index lists come from the last
    /// tree's out-of-bag confusion matrix whether or not early stopping
    /// fired.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | `samples` empty, or a stage consumed every row |
    /// | [`ForestError::TreeGrowthExhausted`] | a stage tree kept failing across bootstraps |
    /// | [`ForestError::StatsIo`] | the stage statistics file is unwritable |
    #[instrument(skip_all, fields(n_samples = samples.len()))]
    pub fn build(config: &CascadeConfig, samples: &mut Dataset) -> Result<Self, ForestError> {
        if samples.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let config = config.resolved();
        let forest_config = config.stage_forest_config();
        let writer = config.stats_file.as_deref().map(StatWriter::new);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        info!(
            n_stages = config.n_stages,
            n_trees = config.n_trees,
            tp_rate = config.tp_rate,
            tn_rate = config.tn_rate,
            "training cascade"
        );

        let mut cascade = Self {
            n_trees_per_stage: config.n_trees,
            forests: Vec::new(),
            weights: Vec::new(),
            stats: Vec::new(),
        };

        for stage in 0..config.n_stages {
            if samples.is_empty() {
                return Err(ForestError::EmptyDataset);
            }

            let mut forest = RandomForest::new(&forest_config, samples)?;
            for _ in 0..config.n_trees {
                let (_, stat) = forest.grow_tree(samples, &mut rng)?;
                // Stop growing this stage once the last tree clears both
                // rate thresholds.
                if stat.tp_rate > config.tp_rate && stat.tn_rate > config.tn_rate {
                    break;
                }
            }

            let last_stat = forest.last_stat().expect("stage grew at least one tree");
            let weight = last_stat.f_measure.exp();
            let mut stage_stat = last_stat.clone();
            stage_stat.id = stage as i64;

            let last_cm = forest
                .last_cmatrix()
                .expect("stage grew at least one tree")
                .clone();
            reshape_samples(samples, &last_cm)?;

            debug!(
                stage,
                weight,
                n_trees = forest.n_trees(),
                n_samples = samples.len(),
                "stage complete"
            );

            if let Some(writer) = &writer {
                writer.append(&stage_stat)?;
            }

            cascade.weights.push(weight);
            cascade.stats.push(stage_stat);
            cascade.forests.push(forest);
        }

        info!(n_stages = cascade.forests.len(), "cascade training complete");
        Ok(cascade)
    }

    /// Classify every row of `samples` by stage-weighted vote and build
    /// the confusion matrix against the original class column.
    ///
    /// Per row, each stage contributes its forests' class vote fractions
    /// scaled by the stage weight; the accumulated probabilities are
    /// normalized by `sum(weights) * trees-per-stage` and the argmax
    /// class wins (ties keep the earlier class in the value space).
    #[must_use]
    pub fn classify_set_by_weight(
        &self,
        samples: &Dataset,
        ids: &[usize],
    ) -> (Vec<String>, ConfusionMatrix) {
        let vs = samples.class_value_space().to_vec();
        let actuals = samples.class_strings();
        let sum_weights: f64 = self.weights.iter().sum();
        let stage_weight = sum_weights * self.n_trees_per_stage as f64;

        let predictions: Vec<String> = samples
            .rows()
            .iter()
            .map(|row| {
                let probs = self.stage_probabilities(row, &vs, stage_weight);
                vs[argmax_first(&probs)].clone()
            })
            .collect();

        let mut cm = ConfusionMatrix::from_labels(&vs, &actuals, &predictions);
        if ids.is_empty() {
            let all: Vec<usize> = (0..actuals.len()).collect();
            cm.group_index_predictions(&all, &actuals, &predictions);
        } else {
            cm.group_index_predictions(ids, &actuals, &predictions);
        }

        (predictions, cm)
    }

    /// Accumulated per-class probabilities for one row, reset per call.
    fn stage_probabilities(&self, row: &Row, vs: &[String], stage_weight: f64) -> Vec<f64> {
        let mut probs = vec![0.0f64; vs.len()];
        for (y, forest) in self.forests.iter().enumerate() {
            let votes = forest.votes(row);
            let total = votes.len() as f64;
            if total == 0.0 {
                continue;
            }
            for (z, class) in vs.iter().enumerate() {
                let count = votes.iter().filter(|v| *v == class).count() as f64;
                probs[z] += (count / total) * self.weights[y];
            }
        }
        for p in &mut probs {
            *p /= stage_weight;
        }
        probs
    }

    /// The per-stage forests.
    #[must_use]
    pub fn forests(&self) -> &[RandomForest] {
        &self.forests
    }

    /// The per-stage weights, exp(F-measure of the stage's last tree).
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The per-stage statistics.
    #[must_use]
    pub fn stats(&self) -> &[Stat] {
        &self.stats
    }

    /// Number of stages built.
    #[must_use]
    pub fn n_stages(&self) -> usize {
        self.forests.len()
    }
}

/// Apply the between-stage reshaping: drop true negatives, duplicate
/// false positives.
///
/// The false-positive rows are resolved before any deletion so both
/// index lists address the same row numbering the confusion matrix was
/// built against; deletions then run in descending index order so
/// earlier removals cannot shift later targets.
fn reshape_samples(samples: &mut Dataset, cm: &ConfusionMatrix) -> Result<(), ForestError> {
    let fp_rows: Vec<Row> = cm
        .fp_indices()
        .iter()
        .filter_map(|&i| samples.row(i).cloned())
        .collect();

    let mut tn = cm.tn_indices().to_vec();
    tn.sort_unstable_by(|a, b| b.cmp(a));
    for i in tn {
        samples.delete_row(i);
    }

    for row in fp_rows {
        samples.push_row(row)?;
    }
    Ok(())
}

fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use banyan_data::{Attribute, Schema, Value};

    use super::*;

    fn schema() -> Schema {
        Schema::new(
            vec![
                Attribute::real("x"),
                Attribute::real("y"),
                Attribute::nominal("class", vec!["0".into(), "1".into()]),
            ],
            2,
        )
        .unwrap()
    }

    fn row(x: f64, y: f64, class: &str) -> Row {
        Row::new(vec![
            Value::Real(x),
            Value::Real(y),
            Value::Str(class.into()),
        ])
    }

    /// Imbalanced but separable binary data: 30 negatives, 12 positives.
    fn imbalanced() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..30 {
            rows.push(row(i as f64 * 0.1, 1.0, "0"));
        }
        for i in 0..12 {
            rows.push(row(8.0 + i as f64 * 0.1, 1.0, "1"));
        }
        Dataset::from_rows(schema(), rows).unwrap()
    }

    fn small_cascade_config(n_stages: usize) -> CascadeConfig {
        CascadeConfig::new()
            .with_n_stages(n_stages)
            .with_n_trees(3)
            .with_seed(42)
            .with_stats_file(None)
    }

    #[test]
    fn empty_input_error() {
        let mut ds = Dataset::new(schema());
        let err = Cascade::build(&small_cascade_config(2), &mut ds).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn builds_requested_stages_with_weights() {
        let mut ds = imbalanced();
        let dir = tempfile::tempdir().unwrap();
        let stats_path = dir.path().join("cascade.stats");
        let cfg = small_cascade_config(3).with_stats_file(Some(stats_path.clone()));

        let cascade = Cascade::build(&cfg, &mut ds).unwrap();
        assert_eq!(cascade.n_stages(), 3);
        assert_eq!(cascade.weights().len(), 3);
        // Weight = exp(F-measure), so every weight lies in [1, e] when
        // the F-measure is defined, or is NaN when it is not.
        for w in cascade.weights() {
            assert!(w.is_nan() || (1.0..=std::f64::consts::E + 1e-9).contains(w));
        }
        // One stats line per stage.
        let contents = std::fs::read_to_string(&stats_path).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn reshaping_drops_tns_and_duplicates_fps() {
        let mut ds = imbalanced();
        let vs: Vec<String> = vec!["1".into(), "0".into()];
        let actuals: Vec<String> = (0..6)
            .map(|i| if i < 3 { "1".to_string() } else { "0".to_string() })
            .collect();
        let predictions: Vec<String> =
            ["1", "1", "0", "1", "0", "0"].iter().map(|s| s.to_string()).collect();
        let mut cm = ConfusionMatrix::from_labels(&vs, &actuals, &predictions);
        let ids: Vec<usize> = (0..6).collect();
        cm.group_index_predictions(&ids, &actuals, &predictions);

        // TN at ids 4, 5; FP at id 3.
        let before = ds.len();
        let fp_row = ds.row(3).cloned().unwrap();
        reshape_samples(&mut ds, &cm).unwrap();
        assert_eq!(ds.len(), before - 2 + 1);
        assert_eq!(ds.row(ds.len() - 1), Some(&fp_row));
    }

    #[test]
    fn weighted_classification_recovers_labels() {
        let mut train = imbalanced();
        let test = imbalanced();
        let cascade = Cascade::build(&small_cascade_config(2), &mut train).unwrap();

        let (predictions, cm) = cascade.classify_set_by_weight(&test, &[]);
        assert_eq!(predictions.len(), test.len());
        assert_eq!(cm.n_samples(), test.len());
        // Separable data: the weighted ensemble should be near-perfect.
        assert!(cm.true_rate() > 0.9);
    }

    #[test]
    fn probabilities_reset_between_rows() {
        let mut train = imbalanced();
        let cascade = Cascade::build(&small_cascade_config(2), &mut train).unwrap();
        let vs: Vec<String> = vec!["0".into(), "1".into()];
        let sum_weights: f64 = cascade.weights().iter().sum();
        let stage_weight = sum_weights * 3.0;

        let negative = row(0.1, 1.0, "0");
        let first = cascade.stage_probabilities(&negative, &vs, stage_weight);
        let second = cascade.stage_probabilities(&negative, &vs, stage_weight);
        assert_eq!(first, second);
    }
}
