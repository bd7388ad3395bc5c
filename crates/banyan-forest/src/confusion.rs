//! Confusion matrix over a class value space.

use std::fmt;

/// A square confusion matrix plus the binary index groups.
///
/// Entry `matrix[i][j]` counts samples whose actual class is value-space
/// entry `i` and whose predicted class is entry `j`. The derived
/// class-error column is `off-diagonal / row-sum` per row, with NaN as
/// the sentinel for an empty row (0/0).
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    value_space: Vec<String>,
    matrix: Vec<Vec<usize>>,
    class_error: Vec<f64>,
    n_samples: usize,
    n_true: usize,
    n_false: usize,
    tp_ids: Vec<usize>,
    fp_ids: Vec<usize>,
    tn_ids: Vec<usize>,
    fn_ids: Vec<usize>,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from actual and predicted class values.
    ///
    /// Iterates only up to the shorter of the two label lists, so a
    /// length mismatch cannot read out of range.
    #[must_use]
    pub fn from_labels(value_space: &[String], actuals: &[String], predictions: &[String]) -> Self {
        let k = value_space.len();
        let mut matrix = vec![vec![0usize; k]; k];

        let n = actuals.len().min(predictions.len());
        for x in 0..n {
            let i = value_space.iter().position(|v| *v == actuals[x]);
            let j = value_space.iter().position(|v| *v == predictions[x]);
            if let (Some(i), Some(j)) = (i, j) {
                matrix[i][j] += 1;
            }
        }

        let mut class_error = Vec::with_capacity(k);
        let mut n_samples = 0;
        let mut n_true = 0;
        let mut n_false = 0;
        for (i, row) in matrix.iter().enumerate() {
            let row_sum: usize = row.iter().sum();
            let wrong = row_sum - row[i];
            // 0/0 yields the NaN sentinel for a class with no samples.
            class_error.push(wrong as f64 / row_sum as f64);
            n_samples += row_sum;
            n_true += row[i];
            n_false += wrong;
        }

        Self {
            value_space: value_space.to_vec(),
            matrix,
            class_error,
            n_samples,
            n_true,
            n_false,
            tp_ids: Vec::new(),
            fp_ids: Vec::new(),
            tn_ids: Vec::new(),
            fn_ids: Vec::new(),
        }
    }

    /// Group sample ids by prediction outcome, under the binary
    /// convention that class `"1"` is positive and `"0"` is negative.
    ///
    /// Iterates up to the shortest of the three lists.
    pub fn group_index_predictions(
        &mut self,
        sample_ids: &[usize],
        actuals: &[String],
        predictions: &[String],
    ) {
        self.tp_ids.clear();
        self.fp_ids.clear();
        self.tn_ids.clear();
        self.fn_ids.clear();

        let n = sample_ids.len().min(actuals.len()).min(predictions.len());
        for x in 0..n {
            let actual_pos = actuals[x] == "1";
            let predicted_pos = predictions[x] == "1";
            match (actual_pos, predicted_pos) {
                (true, true) => self.tp_ids.push(sample_ids[x]),
                (true, false) => self.fn_ids.push(sample_ids[x]),
                (false, true) => self.fp_ids.push(sample_ids[x]),
                (false, false) => self.tn_ids.push(sample_ids[x]),
            }
        }
    }

    /// Positions of the positive ("1") and negative ("0") classes in the
    /// value space. Falls back to (first, second) for a binary space
    /// without those literals.
    fn pos_neg(&self) -> Option<(usize, usize)> {
        let pos = self.value_space.iter().position(|v| v == "1");
        let neg = self.value_space.iter().position(|v| v == "0");
        match (pos, neg) {
            (Some(p), Some(n)) => Some((p, n)),
            _ if self.value_space.len() == 2 => Some((0, 1)),
            _ => None,
        }
    }

    /// True-positive count (binary convention).
    #[must_use]
    pub fn tp(&self) -> usize {
        self.pos_neg().map_or(0, |(p, _)| self.matrix[p][p])
    }

    /// False-negative count (binary convention).
    #[must_use]
    pub fn fn_(&self) -> usize {
        self.pos_neg().map_or(0, |(p, n)| self.matrix[p][n])
    }

    /// False-positive count (binary convention).
    #[must_use]
    pub fn fp(&self) -> usize {
        self.pos_neg().map_or(0, |(p, n)| self.matrix[n][p])
    }

    /// True-negative count (binary convention).
    #[must_use]
    pub fn tn(&self) -> usize {
        self.pos_neg().map_or(0, |(_, n)| self.matrix[n][n])
    }

    /// Fraction of correctly classified samples: nTrue / (nTrue + nFalse).
    /// NaN when the matrix is empty.
    #[must_use]
    pub fn true_rate(&self) -> f64 {
        self.n_true as f64 / (self.n_true + self.n_false) as f64
    }

    /// Fraction of misclassified samples: nFalse / (nTrue + nFalse).
    /// NaN when the matrix is empty.
    #[must_use]
    pub fn false_rate(&self) -> f64 {
        self.n_false as f64 / (self.n_true + self.n_false) as f64
    }

    /// Total number of counted samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Diagonal sum.
    #[must_use]
    pub fn n_true(&self) -> usize {
        self.n_true
    }

    /// Off-diagonal sum.
    #[must_use]
    pub fn n_false(&self) -> usize {
        self.n_false
    }

    /// The underlying count rows, `[actual][predicted]`.
    #[must_use]
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Per-row class error (NaN for empty rows).
    #[must_use]
    pub fn class_errors(&self) -> &[f64] {
        &self.class_error
    }

    /// The class value space this matrix was built over.
    #[must_use]
    pub fn value_space(&self) -> &[String] {
        &self.value_space
    }

    /// Ids of true-positive samples (after [`Self::group_index_predictions`]).
    #[must_use]
    pub fn tp_indices(&self) -> &[usize] {
        &self.tp_ids
    }

    /// Ids of false-positive samples.
    #[must_use]
    pub fn fp_indices(&self) -> &[usize] {
        &self.fp_ids
    }

    /// Ids of true-negative samples.
    #[must_use]
    pub fn tn_indices(&self) -> &[usize] {
        &self.tn_ids
    }

    /// Ids of false-negative samples.
    #[must_use]
    pub fn fn_indices(&self) -> &[usize] {
        &self.fn_ids
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "")?;
        for v in &self.value_space {
            write!(f, " pred_{v:>4}")?;
        }
        writeln!(f, " class_error")?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{:>5}", self.value_space[i])?;
            for val in row {
                write!(f, " {val:>9}")?;
            }
            writeln!(f, " {:>11.4}", self.class_error[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vs() -> Vec<String> {
        vec!["1".into(), "0".into()]
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn counts_and_totals() {
        let actuals = labels(&["1", "1", "0", "0", "1", "0"]);
        let predictions = labels(&["1", "0", "1", "0", "1", "1"]);
        let cm = ConfusionMatrix::from_labels(&vs(), &actuals, &predictions);

        assert_eq!(cm.tp(), 2);
        assert_eq!(cm.fn_(), 1);
        assert_eq!(cm.fp(), 2);
        assert_eq!(cm.tn(), 1);
        assert_eq!(cm.n_samples(), 6);
        assert_eq!(cm.n_true(), 3);
        assert_eq!(cm.n_false(), 3);
        assert!((cm.true_rate() - 0.5).abs() < f64::EPSILON);
        assert!((cm.false_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn row_sums_partition_the_actuals() {
        let actuals = labels(&["1", "1", "1", "0", "0"]);
        let predictions = labels(&["1", "0", "1", "0", "1"]);
        let cm = ConfusionMatrix::from_labels(&vs(), &actuals, &predictions);
        assert_eq!(cm.tp() + cm.fn_(), 3);
        assert_eq!(cm.tn() + cm.fp(), 2);
        let total: usize = cm.rows().iter().flatten().sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn length_mismatch_counts_only_overlap() {
        let actuals = labels(&["1", "1", "0"]);
        let predictions = labels(&["1", "0"]);
        let cm = ConfusionMatrix::from_labels(&vs(), &actuals, &predictions);
        assert_eq!(cm.n_samples(), 2);
    }

    #[test]
    fn empty_row_class_error_is_nan() {
        let space = vec!["1".to_string(), "0".to_string(), "2".to_string()];
        let actuals = labels(&["1", "0"]);
        let predictions = labels(&["1", "0"]);
        let cm = ConfusionMatrix::from_labels(&space, &actuals, &predictions);
        assert!(cm.class_errors()[2].is_nan());
        assert!((cm.class_errors()[0] - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn group_index_predictions_example() {
        let ids = [0, 1, 2, 3, 4, 5];
        let actuals = labels(&["1", "1", "0", "0", "1", "0"]);
        let predictions = labels(&["1", "0", "1", "0", "1", "1"]);
        let mut cm = ConfusionMatrix::from_labels(&vs(), &actuals, &predictions);
        cm.group_index_predictions(&ids, &actuals, &predictions);

        assert_eq!(cm.tp_indices(), &[0, 4]);
        assert_eq!(cm.fp_indices(), &[2, 5]);
        assert_eq!(cm.tn_indices(), &[3]);
        assert_eq!(cm.fn_indices(), &[1]);
    }

    #[test]
    fn display_contains_headers() {
        let cm = ConfusionMatrix::from_labels(&vs(), &labels(&["1"]), &labels(&["1"]));
        let out = format!("{cm}");
        assert!(out.contains("pred_"));
        assert!(out.contains("true_"));
        assert!(out.contains("class_error"));
    }
}
