//! Random Forest: bagging over CART trees with out-of-bag evaluation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use banyan_data::{Dataset, Row};

use crate::cart::CartConfig;
use crate::config::RandomForestConfig;
use crate::confusion::ConfusionMatrix;
use crate::error::ForestError;
use crate::stats::{Stat, StatWriter};
use crate::tree::DecisionTree;

/// Bootstrap-and-grow attempts per tree before giving up.
const MAX_GROW_ATTEMPTS: usize = 32;

/// A Random Forest under construction or fitted.
///
/// Holds one bag index list per tree so out-of-bag membership can be
/// tested against the bag, plus the per-tree confusion matrices and the
/// cumulative out-of-bag error bookkeeping.
#[derive(Debug)]
pub struct RandomForest {
    n_random_feature: usize,
    n_subsample: usize,
    run_oob: bool,
    stat_writer: Option<StatWriter>,

    trees: Vec<DecisionTree>,
    bag_indices: Vec<Vec<usize>>,
    cmatrices: Vec<ConfusionMatrix>,
    stats: Vec<Stat>,

    oob_error_total: f64,
    oob_error_steps: Vec<f64>,
    oob_error_means: Vec<f64>,
}

impl RandomForest {
    /// Prepare an empty forest for the given samples, resolving config
    /// defaults against the sample shape.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::EmptyDataset`] when `samples` has no rows.
    pub fn new(config: &RandomForestConfig, samples: &Dataset) -> Result<Self, ForestError> {
        if samples.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let (_, n_random_feature, percent_boot) = config.resolve(samples.column_count());
        let n_subsample = samples.len() * percent_boot / 100;

        Ok(Self {
            n_random_feature,
            n_subsample: n_subsample.max(1),
            run_oob: config.run_oob,
            stat_writer: config
                .oob_stats_file
                .as_deref()
                .map(StatWriter::new),
            trees: Vec::new(),
            bag_indices: Vec::new(),
            cmatrices: Vec::new(),
            stats: Vec::new(),
            oob_error_total: 0.0,
            oob_error_steps: Vec::new(),
            oob_error_means: Vec::new(),
        })
    }

    /// Train a forest of `config.n_trees` trees on `samples`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | `samples` has no rows |
    /// | [`ForestError::TreeGrowthExhausted`] | a tree kept failing across bootstraps |
    /// | [`ForestError::StatsIo`] | the OOB statistics file is unwritable |
    #[instrument(skip_all, fields(n_samples = samples.len()))]
    pub fn build(config: &RandomForestConfig, samples: &Dataset) -> Result<Self, ForestError> {
        let (n_trees, _, _) = config.resolve(samples.column_count());
        let mut forest = Self::new(config, samples)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        info!(
            n_trees,
            n_random_feature = forest.n_random_feature,
            n_subsample = forest.n_subsample,
            "training random forest"
        );

        for t in 0..n_trees {
            forest.grow_tree(samples, &mut rng)?;
            debug!(
                tree = t,
                oob_error_mean = forest.oob_error_means.last(),
                "tree grown"
            );
        }

        info!(
            oob_error_mean = forest.oob_error_means.last(),
            "random forest training complete"
        );
        Ok(forest)
    }

    /// Grow one tree: bootstrap, CART, bag bookkeeping, OOB evaluation.
    ///
    /// A growth failure (no gain-positive attribute on the bag) is
    /// retried with a fresh bootstrap up to [`MAX_GROW_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// [`ForestError::TreeGrowthExhausted`] when every bootstrap failed;
    /// [`ForestError::StatsIo`] when the stats file is unwritable.
    pub fn grow_tree(
        &mut self,
        samples: &Dataset,
        rng: &mut ChaCha8Rng,
    ) -> Result<(&ConfusionMatrix, &Stat), ForestError> {
        let cart = CartConfig::new().with_n_random_feature(Some(self.n_random_feature));

        let mut grown = None;
        for _ in 0..MAX_GROW_ATTEMPTS {
            let pick = samples.random_pick(self.n_subsample, true, rng);
            match cart.grow(pick.picked, rng) {
                Ok(tree) => {
                    grown = Some((tree, pick.picked_idx, pick.remainder, pick.remainder_idx));
                    break;
                }
                Err(ForestError::TreeGrowthFailure) => continue,
                Err(e) => return Err(e),
            }
        }
        let (tree, bag_idx, mut oob, oob_idx) = grown.ok_or(ForestError::TreeGrowthExhausted {
            attempts: MAX_GROW_ATTEMPTS,
        })?;

        self.trees.push(tree);
        self.bag_indices.push(bag_idx);

        let cm = self.classify_set(&mut oob, &oob_idx, true);
        let stat = self.accumulate_stat(&cm);

        if self.run_oob
            && let Some(writer) = &self.stat_writer
        {
            writer.append(&stat)?;
        }

        self.cmatrices.push(cm);
        self.stats.push(stat);

        Ok((
            self.cmatrices.last().expect("just pushed"),
            self.stats.last().expect("just pushed"),
        ))
    }

    /// Classify every row of `testset` by majority vote and build the
    /// confusion matrix against the original class column.
    ///
    /// The class column is saved, cleared while predictions are written,
    /// and restored afterwards. With `uniq` set, a tree does not vote on
    /// a row whose original index (`ids[x]`) appears in that tree's bag,
    /// which is the out-of-bag evaluation rule. Ties pick the earlier
    /// class in the value space; a row no tree may vote on gets the
    /// first class.
    pub fn classify_set(
        &self,
        testset: &mut Dataset,
        ids: &[usize],
        uniq: bool,
    ) -> ConfusionMatrix {
        let vs = testset.class_value_space().to_vec();
        let saved = testset.class_strings();
        testset.clear_class_column();

        let predictions: Vec<String> = testset
            .rows()
            .par_iter()
            .enumerate()
            .map(|(x, row)| {
                let votes = self.vote_counts(row, &vs, uniq.then(|| ids.get(x).copied()).flatten());
                vs[argmax_first(&votes)].clone()
            })
            .collect();

        for (x, pred) in predictions.iter().enumerate() {
            testset.set_class_string(x, pred);
        }

        let mut cm = ConfusionMatrix::from_labels(&vs, &saved, &predictions);
        if ids.is_empty() {
            let all: Vec<usize> = (0..saved.len()).collect();
            cm.group_index_predictions(&all, &saved, &predictions);
        } else {
            cm.group_index_predictions(ids, &saved, &predictions);
        }

        testset.set_class_strings(&saved);
        cm
    }

    /// Per-class vote counts for one row.
    ///
    /// `exclude_bagged`: when set, trees whose bag contains this original
    /// index do not vote.
    fn vote_counts(&self, row: &Row, vs: &[String], exclude_bagged: Option<usize>) -> Vec<usize> {
        let mut counts = vec![0usize; vs.len()];
        for (y, tree) in self.trees.iter().enumerate() {
            if let Some(orig) = exclude_bagged
                && self.bag_indices[y].contains(&orig)
            {
                continue;
            }
            let class = tree.classify(row);
            if let Some(pos) = vs.iter().position(|v| v == class) {
                counts[pos] += 1;
            }
        }
        counts
    }

    /// The raw class votes of every tree for one row (no bag filter).
    #[must_use]
    pub fn votes(&self, row: &Row) -> Vec<&str> {
        self.trees.iter().map(|t| t.classify(row)).collect()
    }

    /// Majority-vote prediction over all trees for one row.
    #[must_use]
    pub fn classify(&self, row: &Row, vs: &[String]) -> String {
        let counts = self.vote_counts(row, vs, None);
        vs[argmax_first(&counts)].clone()
    }

    fn accumulate_stat(&mut self, cm: &ConfusionMatrix) -> Stat {
        let oob_error = cm.false_rate();
        self.oob_error_steps.push(oob_error);
        self.oob_error_total += oob_error;
        let mean = self.oob_error_total / self.oob_error_steps.len() as f64;
        self.oob_error_means.push(mean);

        let mut stat = Stat::from_matrix(self.trees.len() as i64 - 1, cm);
        stat.oob_error = oob_error;
        stat.oob_error_mean = mean;
        stat
    }

    /// The fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Number of trees grown so far.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Bag (bootstrap) index lists, one per tree.
    #[must_use]
    pub fn bag_indices(&self) -> &[Vec<usize>] {
        &self.bag_indices
    }

    /// Per-tree OOB confusion matrices.
    #[must_use]
    pub fn cmatrices(&self) -> &[ConfusionMatrix] {
        &self.cmatrices
    }

    /// Per-tree statistics.
    #[must_use]
    pub fn stats(&self) -> &[Stat] {
        &self.stats
    }

    /// The most recent tree's confusion matrix.
    #[must_use]
    pub fn last_cmatrix(&self) -> Option<&ConfusionMatrix> {
        self.cmatrices.last()
    }

    /// The most recent tree's statistics.
    #[must_use]
    pub fn last_stat(&self) -> Option<&Stat> {
        self.stats.last()
    }

    /// Per-tree OOB error values.
    #[must_use]
    pub fn oob_error_steps(&self) -> &[f64] {
        &self.oob_error_steps
    }

    /// Running OOB error mean after each tree.
    #[must_use]
    pub fn oob_error_means(&self) -> &[f64] {
        &self.oob_error_means
    }

    /// Mean OOB error over all grown trees.
    #[must_use]
    pub fn oob_error_total_mean(&self) -> f64 {
        self.oob_error_total / self.trees.len() as f64
    }
}

/// Index of the first maximum.
fn argmax_first(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

impl RandomForestConfig {
    /// Train a Random Forest on `samples` with this configuration.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::build`].
    pub fn fit(&self, samples: &Dataset) -> Result<RandomForest, ForestError> {
        RandomForest::build(self, samples)
    }
}

#[cfg(test)]
mod tests {
    use banyan_data::{Attribute, Row, Schema, Value};

    use super::*;

    fn schema(n_features: usize) -> Schema {
        let mut attrs: Vec<Attribute> = (0..n_features)
            .map(|i| Attribute::real(format!("f{i}")))
            .collect();
        attrs.push(Attribute::nominal("class", vec!["0".into(), "1".into()]));
        Schema::new(attrs, n_features).unwrap()
    }

    /// Two well-separated clusters, 20 rows per class.
    fn separable() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..20 {
            let x = i as f64 * 0.15;
            rows.push(Row::new(vec![
                Value::Real(x),
                Value::Real(0.5),
                Value::Str("0".into()),
            ]));
        }
        for i in 0..20 {
            let x = 10.0 + i as f64 * 0.15;
            rows.push(Row::new(vec![
                Value::Real(x),
                Value::Real(0.5),
                Value::Str("1".into()),
            ]));
        }
        Dataset::from_rows(schema(2), rows).unwrap()
    }

    #[test]
    fn empty_dataset_error() {
        let ds = Dataset::new(schema(2));
        let err = RandomForestConfig::new().fit(&ds).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn separable_training_accuracy() {
        let ds = separable();
        let cfg = RandomForestConfig::new()
            .with_n_trees(30)
            .with_seed(42);
        let forest = cfg.fit(&ds).unwrap();
        assert_eq!(forest.n_trees(), 30);

        let vs = ds.class_value_space().to_vec();
        let labels = ds.class_strings();
        let mut correct = 0;
        for (row, label) in ds.rows().iter().zip(&labels) {
            if forest.classify(row, &vs) == *label {
                correct += 1;
            }
        }
        assert!(correct as f64 / ds.len() as f64 > 0.95);
    }

    #[test]
    fn bags_and_matrices_tracked_per_tree() {
        let ds = separable();
        let cfg = RandomForestConfig::new().with_n_trees(5).with_seed(7);
        let forest = cfg.fit(&ds).unwrap();

        assert_eq!(forest.bag_indices().len(), 5);
        assert_eq!(forest.cmatrices().len(), 5);
        assert_eq!(forest.stats().len(), 5);
        assert_eq!(forest.oob_error_steps().len(), 5);
        assert_eq!(forest.oob_error_means().len(), 5);

        // PercentBoot 66 on 40 rows: 26-row bags.
        for bag in forest.bag_indices() {
            assert_eq!(bag.len(), 26);
        }
        // Every OOB confusion matrix counted at least one sample.
        for cm in forest.cmatrices() {
            assert!(cm.n_samples() > 0);
        }
    }

    #[test]
    fn deterministic_with_same_seed() {
        let ds = separable();
        let cfg = RandomForestConfig::new().with_n_trees(5).with_seed(99);
        let f1 = cfg.fit(&ds).unwrap();
        let f2 = cfg.fit(&ds).unwrap();

        let vs = ds.class_value_space().to_vec();
        for row in ds.rows() {
            assert_eq!(f1.classify(row, &vs), f2.classify(row, &vs));
        }
        assert_eq!(f1.bag_indices(), f2.bag_indices());
    }

    #[test]
    fn full_bootstrap_leaves_oob_nonempty() {
        let ds = separable();
        let cfg = RandomForestConfig::new()
            .with_n_trees(10)
            .with_percent_boot(100)
            .with_seed(3);
        let forest = cfg.fit(&ds).unwrap();
        // Bags of size |D|; with replacement some rows stay out of bag
        // with overwhelming probability.
        for bag in forest.bag_indices() {
            assert_eq!(bag.len(), ds.len());
            let distinct: std::collections::HashSet<_> = bag.iter().collect();
            assert!(distinct.len() < ds.len());
        }
    }

    #[test]
    fn classify_set_restores_class_column() {
        let ds = separable();
        let cfg = RandomForestConfig::new().with_n_trees(5).with_seed(11);
        let forest = cfg.fit(&ds).unwrap();

        let mut testset = ds.clone();
        let before = testset.class_strings();
        let cm = forest.classify_set(&mut testset, &[], false);
        assert_eq!(testset.class_strings(), before);
        assert_eq!(cm.n_samples(), ds.len());
    }

    #[test]
    fn oob_stats_file_appends_per_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.oob");
        let ds = separable();
        let cfg = RandomForestConfig::new()
            .with_n_trees(4)
            .with_run_oob(true)
            .with_oob_stats_file(Some(path.clone()))
            .with_seed(5);
        cfg.fit(&ds).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn contradictory_data_recovers_via_rebootstrap() {
        // Two contradictory rows with constant attributes: a mixed bag
        // has no gain-positive split, so growth keeps re-bootstrapping
        // until a pure (single-class) bag comes up and yields a leaf.
        let rows = vec![
            Row::new(vec![
                Value::Real(1.0),
                Value::Real(1.0),
                Value::Str("0".into()),
            ]),
            Row::new(vec![
                Value::Real(1.0),
                Value::Real(1.0),
                Value::Str("1".into()),
            ]),
        ];
        let ds = Dataset::from_rows(schema(2), rows).unwrap();
        let cfg = RandomForestConfig::new()
            .with_n_trees(1)
            .with_percent_boot(100)
            .with_seed(1);
        let forest = cfg.fit(&ds).unwrap();
        assert_eq!(forest.trees()[0].n_nodes(), 1);
    }
}
