//! Gini-gain split search over one attribute.
//!
//! For a continuous attribute the candidate splits are the midpoints
//! between successive distinct sorted values; for a nominal attribute
//! they are all two-block partitions of the value space. Each candidate
//! gets a weighted Gini index and an information gain against the
//! whole-sample Gini.

/// Gini impurity of a class-label sample: `1 - Σ p_c²`.
///
/// An empty sample is pure (0.0).
#[must_use]
pub fn gini_of(targets: &[&str], classes: &[String]) -> f64 {
    let n = targets.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mut sum_sq = 0.0;
    for class in classes {
        let count = targets.iter().filter(|t| *t == class).count() as f64;
        let p = count / n;
        sum_sq += p * p;
    }
    1.0 - sum_sq
}

/// All two-block partitions of a value set, as `[left, right]` block
/// pairs. The first value is pinned to the left block so each unordered
/// partition appears exactly once; a set of size n yields 2^(n-1) - 1
/// partitions.
fn two_block_partitions(values: &[String]) -> Vec<[Vec<String>; 2]> {
    let n = values.len();
    if n < 2 || n > 20 {
        // A 21-value nominal column would enumerate over a million
        // partitions; treat it as unsplittable rather than blow up.
        return Vec::new();
    }
    let full = (1u32 << n) - 1;
    let mut parts = Vec::with_capacity((1usize << (n - 1)) - 1);
    for mask in (1..full).filter(|m| m & 1 == 1) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (i, v) in values.iter().enumerate() {
            if mask >> i & 1 == 1 {
                left.push(v.clone());
            } else {
                right.push(v.clone());
            }
        }
        parts.push([left, right]);
    }
    parts
}

/// Split descriptor for one attribute at one induction step.
///
/// Transient: built per node-split decision, then discarded.
#[derive(Debug, Clone)]
pub struct GiniScan {
    /// Excluded from the split search (feature subsampling, class column).
    pub skip: bool,
    /// Whether the scanned attribute is continuous.
    pub is_continuous: bool,
    /// Whole-sample Gini impurity.
    pub value: f64,
    /// Partition index with the maximum gain.
    pub max_part_gain: usize,
    /// The maximum gain value.
    pub max_gain_value: f64,
    /// Partition index with the minimum nonzero Gini index.
    pub min_index_part: usize,
    /// The minimum nonzero Gini index value.
    pub min_index_value: f64,
    /// Ascending-sort permutation of the attribute values (continuous only).
    pub sorted_index: Vec<usize>,
    /// Candidate thresholds (continuous only).
    pub continuous_parts: Vec<f64>,
    /// Candidate two-block partitions (nominal only).
    pub nominal_parts: Vec<[Vec<String>; 2]>,
    /// Gini index per candidate partition.
    pub index: Vec<f64>,
    /// Information gain per candidate partition.
    pub gain: Vec<f64>,
}

impl Default for GiniScan {
    fn default() -> Self {
        Self {
            skip: false,
            is_continuous: false,
            value: 0.0,
            max_part_gain: 0,
            max_gain_value: 0.0,
            min_index_part: 0,
            min_index_value: 1.0,
            sorted_index: Vec::new(),
            continuous_parts: Vec::new(),
            nominal_parts: Vec::new(),
            index: Vec::new(),
            gain: Vec::new(),
        }
    }
}

impl GiniScan {
    /// Scan a continuous attribute.
    ///
    /// Sorts the values (recording the permutation so the caller can
    /// reorder its rows the same way), enumerates midpoint candidates,
    /// and computes the Gini index and gain of each.
    pub fn compute_continuous(&mut self, values: &[f64], targets: &[String], classes: &[String]) {
        self.is_continuous = true;

        let mut perm: Vec<usize> = (0..values.len()).collect();
        perm.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

        let sorted: Vec<f64> = perm.iter().map(|&i| values[i]).collect();
        let sorted_targets: Vec<&str> = perm.iter().map(|&i| targets[i].as_str()).collect();
        self.sorted_index = perm;

        self.continuous_parts = Self::continuous_partitions(&sorted);
        self.value = gini_of(&sorted_targets, classes);

        let n = sorted.len();
        for p in 0..self.continuous_parts.len() {
            let med = self.continuous_parts[p];
            // First sorted position strictly above the midpoint.
            let split_at = sorted.iter().position(|&v| v > med).unwrap_or(n);

            let n_left = split_at as f64;
            let n_right = (n - split_at) as f64;
            let g_left = gini_of(&sorted_targets[..split_at], classes);
            let g_right = gini_of(&sorted_targets[split_at..], classes);

            let index = (n_left / n as f64) * g_left + (n_right / n as f64) * g_right;
            let gain = self.value - index;
            self.index.push(index);
            self.gain.push(gain);

            self.track_extremes(p, index, gain);
        }
    }

    /// Candidate thresholds: midpoints of successive sorted values,
    /// excluding zero and any midpoint already equal to an earlier value.
    fn continuous_partitions(sorted: &[f64]) -> Vec<f64> {
        let mut parts = Vec::new();
        for i in 0..sorted.len().saturating_sub(1) {
            let med = (sorted[i] + sorted[i + 1]) / 2.0;
            // A zero midpoint means both sides are zero; splitting there
            // degenerates into an empty-left partition.
            if med == 0.0 {
                continue;
            }
            // Equality with an already-seen value also covers the
            // sorted[i] == sorted[i+1] case.
            if sorted[..=i].iter().any(|&v| v == med) {
                continue;
            }
            parts.push(med);
        }
        parts
    }

    /// Scan a nominal attribute over all two-block partitions of its
    /// value space.
    pub fn compute_nominal(
        &mut self,
        values: &[String],
        value_space: &[String],
        targets: &[String],
        classes: &[String],
    ) {
        self.is_continuous = false;
        self.nominal_parts = two_block_partitions(value_space);

        let all: Vec<&str> = targets.iter().map(String::as_str).collect();
        self.value = gini_of(&all, classes);

        let n = values.len() as f64;
        for p in 0..self.nominal_parts.len() {
            let mut weighted = 0.0;
            for block in &self.nominal_parts[p] {
                let sub: Vec<&str> = values
                    .iter()
                    .zip(targets)
                    .filter(|(v, _)| block.iter().any(|b| b == *v))
                    .map(|(_, t)| t.as_str())
                    .collect();
                weighted += (sub.len() as f64 / n) * gini_of(&sub, classes);
            }
            let gain = self.value - weighted;
            self.index.push(weighted);
            self.gain.push(gain);

            self.track_extremes(p, weighted, gain);
        }
    }

    fn track_extremes(&mut self, part: usize, index: f64, gain: f64) {
        // Strict comparisons: on equal gain the earlier partition wins,
        // and a zero index denotes a degenerate pure split already
        // captured by the max-gain side.
        if index < self.min_index_value && index != 0.0 {
            self.min_index_value = index;
            self.min_index_part = part;
        }
        if gain > self.max_gain_value {
            self.max_gain_value = gain;
            self.max_part_gain = part;
        }
    }

    /// The max-gain threshold of a continuous scan.
    #[must_use]
    pub fn max_part_threshold(&self) -> Option<f64> {
        self.continuous_parts.get(self.max_part_gain).copied()
    }

    /// The max-gain two-block partition of a nominal scan.
    #[must_use]
    pub fn max_part_subset(&self) -> Option<&[Vec<String>; 2]> {
        self.nominal_parts.get(self.max_part_gain)
    }
}

/// Attribute index with the highest max-gain value, skipping flagged
/// scans. Ties keep the first attribute. `None` when no scan has
/// positive gain, which is the tree-growth-failure condition.
#[must_use]
pub fn find_max_gain(scans: &[GiniScan]) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_gain = 0.0;
    for (i, scan) in scans.iter().enumerate() {
        if scan.skip {
            continue;
        }
        if scan.max_gain_value > best_gain {
            best_gain = scan.max_gain_value;
            best = Some(i);
        }
    }
    best
}

/// Attribute index with the smallest nonzero Gini index, skipping
/// flagged scans. Ties keep the first attribute.
#[must_use]
pub fn find_min_gini_index(scans: &[GiniScan]) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_index = 1.0;
    for (i, scan) in scans.iter().enumerate() {
        if scan.skip {
            continue;
        }
        if scan.min_index_value < best_index {
            best_index = scan.min_index_value;
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["P".into(), "N".into()]
    }

    fn targets() -> Vec<String> {
        ["P", "P", "N", "P", "N", "N", "N", "P", "N"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn gini_pure_sample_is_zero() {
        let t = ["P", "P", "P"];
        assert!((gini_of(&t, &classes()) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_balanced_binary_is_half() {
        let t = ["P", "N", "P", "N"];
        assert!((gini_of(&t, &classes()) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn continuous_scan_known_sample() {
        // A = [1,6,5,4,7,3,8,7,5], T = [P,P,N,P,N,N,N,P,N]
        let values = [1.0, 6.0, 5.0, 4.0, 7.0, 3.0, 8.0, 7.0, 5.0];
        let mut scan = GiniScan::default();
        scan.compute_continuous(&values, &targets(), &classes());

        // Whole-sample Gini = 1 - (4/9)^2 - (5/9)^2
        assert!((scan.value - 40.0 / 81.0).abs() < 1e-12);

        // Midpoints exclude duplicates of already-seen sorted values
        // (5 between the two 5s, 7 between the two 7s).
        assert_eq!(scan.continuous_parts, vec![2.0, 3.5, 4.5, 5.5, 6.5, 7.5]);

        // Best split is below 3: one pure P on the left.
        assert_eq!(scan.max_part_gain, 0);
        let expected_index = (8.0 / 9.0) * (30.0 / 64.0);
        assert!((scan.max_gain_value - (scan.value - expected_index)).abs() < 1e-12);

        // Gini value decomposes as index + gain for every partition.
        for p in 0..scan.index.len() {
            assert!((scan.value - (scan.index[p] + scan.gain[p])).abs() < 1e-12);
        }
    }

    #[test]
    fn continuous_all_zero_attribute_has_no_partitions() {
        let values = [0.0; 9];
        let mut scan = GiniScan::default();
        scan.compute_continuous(&values, &targets(), &classes());
        assert!(scan.continuous_parts.is_empty());
        assert_eq!(scan.max_gain_value, 0.0);
        assert_eq!(find_max_gain(&[scan]), None);
    }

    #[test]
    fn nominal_scan_binary_value_space() {
        // A = [T,T,T,F,F,F,F,T,F]; the only 2-partition is {{T},{F}}.
        let values: Vec<String> = ["T", "T", "T", "F", "F", "F", "F", "T", "F"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let space = vec!["T".to_string(), "F".to_string()];
        let mut scan = GiniScan::default();
        scan.compute_nominal(&values, &space, &targets(), &classes());

        assert_eq!(scan.nominal_parts.len(), 1);
        // T rows: P,P,N,P; F rows: P,N,N,N,N.
        let expected_index = (4.0 / 9.0) * (6.0 / 16.0) + (5.0 / 9.0) * (8.0 / 25.0);
        assert!((scan.index[0] - expected_index).abs() < 1e-12);
        assert!((scan.value - (scan.index[0] + scan.gain[0])).abs() < 1e-12);
    }

    #[test]
    fn two_block_partition_count_matches_stirling() {
        let vals: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        // S(4, 2) = 7
        assert_eq!(two_block_partitions(&vals).len(), 7);
        assert!(two_block_partitions(&vals[..1]).is_empty());
    }

    #[test]
    fn find_max_gain_skips_flagged_and_ties_keep_first() {
        let mut a = GiniScan::default();
        a.max_gain_value = 0.4;
        let mut b = GiniScan::default();
        b.max_gain_value = 0.4;
        let mut skipped = GiniScan::default();
        skipped.max_gain_value = 0.9;
        skipped.skip = true;
        assert_eq!(find_max_gain(&[skipped, a, b]), Some(1));
    }

    #[test]
    fn min_index_is_true_minimum() {
        // The attribute with the genuinely smallest index must win; a
        // swapped comparison direction would never update the running
        // minimum.
        let mut high = GiniScan::default();
        high.min_index_value = 0.45;
        let mut low = GiniScan::default();
        low.min_index_value = 0.12;
        assert_eq!(find_min_gini_index(&[high, low]), Some(1));
    }

    #[test]
    fn zero_index_partition_ineligible_for_minimum() {
        let mut scan = GiniScan::default();
        // Partition 0 is pure (index 0), partition 1 is not.
        scan.track_extremes(0, 0.0, 0.5);
        scan.track_extremes(1, 0.3, 0.2);
        assert_eq!(scan.min_index_part, 1);
        assert!((scan.min_index_value - 0.3).abs() < f64::EPSILON);
    }
}
