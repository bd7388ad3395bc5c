//! CART induction: recursive binary splitting on maximum Gini gain.

use rand::Rng;
use tracing::{debug, instrument};

use banyan_data::{Dataset, SplitValue};

use crate::error::ForestError;
use crate::gini::{self, GiniScan};
use crate::tree::{DecisionTree, Node};

/// Configuration for growing a single CART tree.
///
/// # Defaults
///
/// | Parameter          | Default                |
/// |--------------------|------------------------|
/// | `n_random_feature` | `None` (all features)  |
#[derive(Debug, Clone, Default)]
pub struct CartConfig {
    n_random_feature: Option<usize>,
}

impl CartConfig {
    /// Create a config that considers every non-class attribute.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit each tree to a random subset of attributes.
    ///
    /// `None` considers all non-class attributes; `Some(m)` samples `m`
    /// attribute indices without replacement before growth and marks the
    /// rest as skipped for the whole tree.
    #[must_use]
    pub fn with_n_random_feature(mut self, n_random_feature: Option<usize>) -> Self {
        self.n_random_feature = n_random_feature;
        self
    }

    /// Return the feature-subsampling setting.
    #[must_use]
    pub fn n_random_feature(&self) -> Option<usize> {
        self.n_random_feature
    }

    /// Grow a tree on the given samples.
    ///
    /// The dataset is consumed: induction sorts and repartitions it in
    /// place along the recursion.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | no rows |
    /// | [`ForestError::TreeGrowthFailure`] | no attribute with positive gain at the root or below |
    #[instrument(skip_all, fields(n_samples = samples.len()))]
    pub fn grow(
        &self,
        mut samples: Dataset,
        rng: &mut impl Rng,
    ) -> Result<DecisionTree, ForestError> {
        if samples.is_empty() {
            return Err(ForestError::EmptyDataset);
        }

        let usable = select_features(&samples, self.n_random_feature, rng);
        let fallback = samples
            .majority_class()
            .unwrap_or_default()
            .to_string();

        let root = build_node(&mut samples, &fallback, &usable)?;
        let tree = DecisionTree::new(root);
        debug!(n_nodes = tree.n_nodes(), depth = tree.depth(), "cart tree grown");
        Ok(tree)
    }
}

/// Pick the attribute subset for one tree.
///
/// Returns a per-column usable flag; the class column is never usable.
fn select_features(samples: &Dataset, n_random: Option<usize>, rng: &mut impl Rng) -> Vec<bool> {
    let ncol = samples.column_count();
    let class_idx = samples.class_index();

    let mut candidates: Vec<usize> = (0..ncol).filter(|&c| c != class_idx).collect();
    let take = match n_random {
        Some(m) if m < candidates.len() => m,
        _ => candidates.len(),
    };

    // Partial Fisher-Yates: shuffle only the first `take` positions.
    for i in 0..take {
        let j = rng.gen_range(i..candidates.len());
        candidates.swap(i, j);
    }

    let mut usable = vec![false; ncol];
    for &c in &candidates[..take] {
        usable[c] = true;
    }
    usable
}

/// Recursively split the dataset, carrying the parent's majority class
/// down as the fallback label for empty partitions.
fn build_node(d: &mut Dataset, fallback: &str, usable: &[bool]) -> Result<Node, ForestError> {
    if d.is_empty() {
        return Ok(Node::Leaf {
            class: fallback.to_string(),
            size: 0,
        });
    }

    if d.is_single_class() {
        let class = d
            .class_strings()
            .into_iter()
            .next()
            .unwrap_or_else(|| fallback.to_string());
        return Ok(Node::Leaf {
            class,
            size: d.len(),
        });
    }

    let scans = compute_scans(d, usable);
    let best = gini::find_max_gain(&scans).ok_or(ForestError::TreeGrowthFailure)?;
    let scan = &scans[best];

    let split_value = if scan.is_continuous {
        // Reorder the rows by the scan's permutation so the threshold
        // partitions a sorted dataset.
        d.sort_by_index(&scan.sorted_index);
        SplitValue::Threshold(
            scan.max_part_threshold()
                .ok_or(ForestError::TreeGrowthFailure)?,
        )
    } else {
        let blocks = scan
            .max_part_subset()
            .ok_or(ForestError::TreeGrowthFailure)?;
        SplitValue::Subset(blocks[0].clone())
    };

    let size = d.len();
    let majority = d.majority_class().unwrap_or(fallback).to_string();

    let mut left_d = d.split_by_attr_value(best, &split_value);
    let left = build_node(&mut left_d, &majority, usable)?;
    let right = build_node(d, &majority, usable)?;

    Ok(Node::Split {
        attr: best,
        value: split_value,
        is_continuous: scan.is_continuous,
        size,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// One Gini scan per column; the class column and unsampled features are
/// flagged skipped.
fn compute_scans(d: &Dataset, usable: &[bool]) -> Vec<GiniScan> {
    let class_idx = d.class_index();
    let targets = d.class_strings();
    let classes = d.class_value_space().to_vec();

    (0..d.column_count())
        .map(|col| {
            let mut scan = GiniScan::default();
            if col == class_idx || !usable[col] {
                scan.skip = true;
                return scan;
            }
            let attr = d.schema().attribute(col);
            if attr.is_continuous() {
                scan.compute_continuous(&d.numeric_column(col), &targets, &classes);
            } else {
                scan.compute_nominal(
                    &d.string_column(col),
                    attr.nominal_values(),
                    &targets,
                    &classes,
                );
            }
            scan
        })
        .collect()
}
