use std::sync::Arc;

use rand::Rng;

use crate::error::DataError;
use crate::row::Row;
use crate::schema::Schema;
use crate::value::{SplitValue, Value};

/// Result of [`Dataset::random_pick`]: the picked rows, the rows never
/// picked, and the original indices of both.
#[derive(Debug)]
pub struct RandomPick {
    /// The picked rows, in pick order (may repeat with replacement).
    pub picked: Dataset,
    /// Rows that were never picked.
    pub remainder: Dataset,
    /// Original index of each picked row, in pick order.
    pub picked_idx: Vec<usize>,
    /// Original index of each remainder row, ascending.
    pub remainder_idx: Vec<usize>,
}

/// An ordered sequence of rows plus their shared schema.
///
/// The schema is reference-counted so derived datasets (selections,
/// partitions, bootstrap bags) share it without copying.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Create an empty dataset over the given schema.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            rows: Vec::new(),
        }
    }

    /// Create a dataset from rows, validating each against the schema.
    ///
    /// # Errors
    ///
    /// Propagates the first [`Schema::validate_row`] failure.
    pub fn from_rows(schema: Schema, rows: Vec<Row>) -> Result<Self, DataError> {
        for row in &rows {
            schema.validate_row(row)?;
        }
        Ok(Self {
            schema: Arc::new(schema),
            rows,
        })
    }

    /// An empty dataset sharing this dataset's schema.
    #[must_use]
    pub fn clone_empty(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            rows: Vec::new(),
        }
    }

    fn derived(&self, rows: Vec<Row>) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            rows,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    /// The shared schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Zero-based index of the class column.
    #[must_use]
    pub fn class_index(&self) -> usize {
        self.schema.class_index()
    }

    /// Ordered list of legal class values.
    #[must_use]
    pub fn class_value_space(&self) -> &[String] {
        self.schema.class_attribute().nominal_values()
    }

    /// Borrow the row at `index`, if present.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// All rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append a row after validating it against the schema.
    ///
    /// # Errors
    ///
    /// Propagates [`Schema::validate_row`] failures.
    pub fn push_row(&mut self, row: Row) -> Result<(), DataError> {
        self.schema.validate_row(&row)?;
        self.rows.push(row);
        Ok(())
    }

    /// Remove and return the row at `index`; `None` when out of range.
    pub fn delete_row(&mut self, index: usize) -> Option<Row> {
        if index < self.rows.len() {
            Some(self.rows.remove(index))
        } else {
            None
        }
    }

    /// The class value of every row, in row order.
    #[must_use]
    pub fn class_strings(&self) -> Vec<String> {
        let class = self.class_index();
        self.rows
            .iter()
            .map(|r| {
                r.cell(class)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    /// Overwrite the class value of the row at `index`.
    pub fn set_class_string(&mut self, index: usize, value: &str) {
        let class = self.class_index();
        if let Some(row) = self.rows.get_mut(index) {
            row.set_cell(class, Value::Str(value.to_string()));
        }
    }

    /// Overwrite the whole class column; extra values are ignored.
    pub fn set_class_strings(&mut self, values: &[String]) {
        let class = self.class_index();
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.set_cell(class, Value::Str(value.clone()));
        }
    }

    /// Blank out the class column (used while classifying a test set).
    pub fn clear_class_column(&mut self) {
        let class = self.class_index();
        for row in &mut self.rows {
            row.set_cell(class, Value::Str(String::new()));
        }
    }

    /// Row count per class value, aligned with [`Self::class_value_space`].
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        let space = self.class_value_space();
        let class = self.class_index();
        let mut counts = vec![0usize; space.len()];
        for row in &self.rows {
            if let Some(v) = row.cell(class).and_then(Value::as_str)
                && let Some(pos) = space.iter().position(|s| s == v)
            {
                counts[pos] += 1;
            }
        }
        counts
    }

    /// The class value with the most rows; ties keep the earlier value.
    /// `None` when the dataset is empty.
    #[must_use]
    pub fn majority_class(&self) -> Option<&str> {
        if self.rows.is_empty() {
            return None;
        }
        let counts = self.class_counts();
        let space = self.class_value_space();
        let mut best = 0;
        for (i, &c) in counts.iter().enumerate() {
            if c > counts[best] {
                best = i;
            }
        }
        Some(space[best].as_str())
    }

    /// The least-populated class value among those actually present;
    /// ties keep the earlier value. `None` when the dataset is empty.
    #[must_use]
    pub fn minority_class(&self) -> Option<&str> {
        let counts = self.class_counts();
        let space = self.class_value_space();
        counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| space[i].as_str())
    }

    /// Whether every row carries the same class value.
    ///
    /// An empty dataset is not single-class.
    #[must_use]
    pub fn is_single_class(&self) -> bool {
        let class = self.class_index();
        let mut cells = self.rows.iter().map(|r| r.cell(class).and_then(Value::as_str));
        match cells.next() {
            None => false,
            Some(first) => cells.all(|c| c == first),
        }
    }

    /// Rows whose cell in `column` equals the nominal `value`.
    #[must_use]
    pub fn select_rows_where(&self, column: usize, value: &str) -> Dataset {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.cell(column).and_then(Value::as_str) == Some(value))
            .cloned()
            .collect();
        self.derived(rows)
    }

    /// Rows belonging to the minority class.
    #[must_use]
    pub fn minority_rows(&self) -> Dataset {
        match self.minority_class() {
            Some(minor) => {
                let minor = minor.to_string();
                self.select_rows_where(self.class_index(), &minor)
            }
            None => self.clone_empty(),
        }
    }

    /// Pick `n` rows at random.
    ///
    /// With replacement the same row may be picked repeatedly and the
    /// remainder holds rows never picked, giving the bootstrap and
    /// out-of-bag split. Without replacement `n` is clamped to the row
    /// count and the picks are distinct.
    pub fn random_pick(
        &self,
        n: usize,
        with_replacement: bool,
        rng: &mut impl Rng,
    ) -> RandomPick {
        let len = self.rows.len();
        if len == 0 {
            return RandomPick {
                picked: self.clone_empty(),
                remainder: self.clone_empty(),
                picked_idx: Vec::new(),
                remainder_idx: Vec::new(),
            };
        }

        let picked_idx: Vec<usize> = if with_replacement {
            (0..n).map(|_| rng.gen_range(0..len)).collect()
        } else {
            let n = n.min(len);
            // Partial Fisher-Yates: shuffle only the first n positions.
            let mut order: Vec<usize> = (0..len).collect();
            for i in 0..n {
                let j = rng.gen_range(i..len);
                order.swap(i, j);
            }
            order.truncate(n);
            order
        };

        let mut in_pick = vec![false; len];
        for &i in &picked_idx {
            in_pick[i] = true;
        }
        let remainder_idx: Vec<usize> = (0..len).filter(|&i| !in_pick[i]).collect();

        let picked = self.derived(picked_idx.iter().map(|&i| self.rows[i].clone()).collect());
        let remainder =
            self.derived(remainder_idx.iter().map(|&i| self.rows[i].clone()).collect());

        RandomPick {
            picked,
            remainder,
            picked_idx,
            remainder_idx,
        }
    }

    /// Reorder rows so that new row `k` is old row `perm[k]`.
    ///
    /// `perm` is the sorted-index permutation produced by the split
    /// engine; indices outside the row range are skipped.
    pub fn sort_by_index(&mut self, perm: &[usize]) {
        let old = std::mem::take(&mut self.rows);
        let mut rows = Vec::with_capacity(old.len());
        for &i in perm {
            if let Some(row) = old.get(i) {
                rows.push(row.clone());
            }
        }
        self.rows = rows;
    }

    /// Repartition in place by a split criterion.
    ///
    /// Rows matching `split` (at or below a threshold, or inside a
    /// nominal block) are moved into the returned dataset; `self` keeps
    /// the rest. After the call the two datasets cover the original rows
    /// exactly, so callers can recurse on both sides.
    pub fn split_by_attr_value(&mut self, column: usize, split: &SplitValue) -> Dataset {
        let rows = std::mem::take(&mut self.rows);
        let (matched, kept): (Vec<Row>, Vec<Row>) = rows
            .into_iter()
            .partition(|r| r.cell(column).is_some_and(|c| split.matches(c)));
        self.rows = kept;
        self.derived(matched)
    }

    /// Numeric view of a column (integers widen to `f64`).
    #[must_use]
    pub fn numeric_column(&self, column: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.cell(column).and_then(Value::as_f64))
            .collect()
    }

    /// String view of a nominal column.
    #[must_use]
    pub fn string_column(&self, column: usize) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.cell(column).and_then(Value::as_str).map(String::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::schema::Attribute;

    fn schema() -> Schema {
        Schema::new(
            vec![
                Attribute::real("x"),
                Attribute::nominal("color", vec!["r".into(), "g".into(), "b".into()]),
                Attribute::nominal("class", vec!["0".into(), "1".into()]),
            ],
            2,
        )
        .unwrap()
    }

    fn row(x: f64, color: &str, class: &str) -> Row {
        Row::new(vec![
            Value::Real(x),
            Value::Str(color.into()),
            Value::Str(class.into()),
        ])
    }

    fn sample() -> Dataset {
        Dataset::from_rows(
            schema(),
            vec![
                row(1.0, "r", "0"),
                row(2.0, "g", "0"),
                row(3.0, "b", "1"),
                row(4.0, "r", "0"),
                row(5.0, "g", "1"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn majority_and_minority() {
        let ds = sample();
        assert_eq!(ds.majority_class(), Some("0"));
        assert_eq!(ds.minority_class(), Some("1"));
        let minor = ds.minority_rows();
        assert_eq!(minor.len(), 2);
        assert!(minor.class_strings().iter().all(|c| c == "1"));
    }

    #[test]
    fn single_class_detection() {
        let ds = sample();
        assert!(!ds.is_single_class());
        let zeros = ds.select_rows_where(2, "0");
        assert!(zeros.is_single_class());
        assert!(!zeros.clone_empty().is_single_class());
    }

    #[test]
    fn push_row_validates() {
        let mut ds = sample();
        let err = ds.push_row(Row::new(vec![Value::Real(0.0)])).unwrap_err();
        assert!(matches!(err, DataError::RowLengthMismatch { .. }));
        assert_eq!(ds.len(), 5);
    }

    #[test]
    fn delete_out_of_range_is_none() {
        let mut ds = sample();
        assert!(ds.delete_row(99).is_none());
        let removed = ds.delete_row(0).unwrap();
        assert_eq!(removed.cell(0), Some(&Value::Real(1.0)));
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn random_pick_without_replacement_partitions() {
        let ds = sample();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let pick = ds.random_pick(3, false, &mut rng);
        assert_eq!(pick.picked.len(), 3);
        assert_eq!(pick.remainder.len(), 2);
        let mut all: Vec<usize> = pick
            .picked_idx
            .iter()
            .chain(&pick.remainder_idx)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn random_pick_with_replacement_tracks_oob() {
        let ds = sample();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let pick = ds.random_pick(5, true, &mut rng);
        assert_eq!(pick.picked.len(), 5);
        // Every remainder index is absent from the bag.
        for idx in &pick.remainder_idx {
            assert!(!pick.picked_idx.contains(idx));
        }
        assert_eq!(pick.remainder.len(), pick.remainder_idx.len());
    }

    #[test]
    fn split_threshold_partitions_in_place() {
        let mut ds = sample();
        let left = ds.split_by_attr_value(0, &SplitValue::Threshold(2.5));
        assert_eq!(left.len(), 2);
        assert_eq!(ds.len(), 3);
        assert!(left.numeric_column(0).iter().all(|&v| v <= 2.5));
        assert!(ds.numeric_column(0).iter().all(|&v| v > 2.5));
    }

    #[test]
    fn split_subset_partitions_in_place() {
        let mut ds = sample();
        let left = ds.split_by_attr_value(1, &SplitValue::Subset(vec!["r".into(), "b".into()]));
        assert_eq!(left.len(), 3);
        assert_eq!(ds.len(), 2);
        assert!(ds.string_column(1).iter().all(|v| v == "g"));
    }

    #[test]
    fn sort_by_index_applies_permutation() {
        let mut ds = sample();
        ds.sort_by_index(&[4, 3, 2, 1, 0]);
        assert_eq!(ds.numeric_column(0), vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn class_column_save_and_restore() {
        let mut ds = sample();
        let saved = ds.class_strings();
        ds.clear_class_column();
        assert!(ds.class_strings().iter().all(String::is_empty));
        ds.set_class_string(0, "1");
        assert_eq!(ds.class_strings()[0], "1");
        ds.set_class_strings(&saved);
        assert_eq!(ds.class_strings(), saved);
    }
}
