//! K-nearest-neighbor search over dataset rows.

use banyan_data::{Row, Value};

use crate::error::SampleError;

/// How the distance between two rows is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMethod {
    /// Square root of the summed absolute differences of the numeric
    /// non-class cells.
    #[default]
    Euclidean,
}

impl DistanceMethod {
    /// Map a configuration integer to a distance method.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::UnknownDistanceMethod`] for codes without
    /// a mapping (0 = Euclidean).
    pub fn from_code(code: i64) -> Result<Self, SampleError> {
        match code {
            0 => Ok(DistanceMethod::Euclidean),
            _ => Err(SampleError::UnknownDistanceMethod { code }),
        }
    }
}

/// One search hit: the row, its index in the searched slice, and its
/// distance to the query.
#[derive(Debug, Clone)]
pub struct Neighbor {
    /// The neighboring row.
    pub row: Row,
    /// Index of the row in the searched slice.
    pub index: usize,
    /// Distance to the query row.
    pub distance: f64,
}

/// An ascending-distance list of neighbors.
#[derive(Debug, Clone, Default)]
pub struct Neighbors(Vec<Neighbor>);

impl Neighbors {
    /// Number of neighbors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the neighbor at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Neighbor> {
        self.0.get(position)
    }

    /// Replace the neighbor at `position`. Out-of-range is ignored.
    pub fn replace(&mut self, position: usize, neighbor: Neighbor) {
        if let Some(slot) = self.0.get_mut(position) {
            *slot = neighbor;
        }
    }

    /// The first `k` neighbors as a new list.
    #[must_use]
    pub fn take(&self, k: usize) -> Neighbors {
        Neighbors(self.0.iter().take(k).cloned().collect())
    }

    /// Position of the neighbor whose searched-slice index is `index`.
    #[must_use]
    pub fn position_of_index(&self, index: usize) -> Option<usize> {
        self.0.iter().position(|n| n.index == index)
    }

    /// Count neighbors whose cell in `column` equals the nominal `value`.
    #[must_use]
    pub fn count_where(&self, column: usize, value: &str) -> usize {
        self.0
            .iter()
            .filter(|n| n.row.cell(column).and_then(Value::as_str) == Some(value))
            .count()
    }

    /// Iterate over the neighbors in ascending distance order.
    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> {
        self.0.iter()
    }
}

/// KNN search parameters.
#[derive(Debug, Clone)]
pub struct Knn {
    /// Number of neighbors to return.
    pub k: usize,
    /// Class column index, excluded from the distance.
    pub class_index: usize,
    /// Distance measure.
    pub distance_method: DistanceMethod,
}

impl Knn {
    /// Every row of `rows` sorted by ascending distance to `query`.
    ///
    /// `exclude` names the query's own index in `rows` so a row is never
    /// its own neighbor; rows that merely equal the query by value stay
    /// eligible. The full list is what LN-SMOTE indexes past `k` into.
    #[must_use]
    pub fn sorted_neighbors(&self, rows: &[Row], query: &Row, exclude: Option<usize>) -> Neighbors {
        let mut hits: Vec<Neighbor> = rows
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .map(|(i, row)| Neighbor {
                row: row.clone(),
                index: i,
                distance: self.distance(query, row),
            })
            .collect();
        // Stable sort keeps the earlier row on distance ties.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Neighbors(hits)
    }

    /// The `k` nearest rows to `query` (fewer when `rows` is small).
    #[must_use]
    pub fn neighbors(&self, rows: &[Row], query: &Row, exclude: Option<usize>) -> Neighbors {
        self.sorted_neighbors(rows, query, exclude).take(self.k)
    }

    /// Distance between two rows.
    ///
    /// Numeric cells contribute their absolute difference to the sum
    /// before the square root; nominal cells and the class column
    /// contribute nothing.
    #[must_use]
    pub fn distance(&self, a: &Row, b: &Row) -> f64 {
        match self.distance_method {
            DistanceMethod::Euclidean => {
                let mut sum = 0.0;
                for (i, (ca, cb)) in a.cells().zip(b.cells()).enumerate() {
                    if i == self.class_index {
                        continue;
                    }
                    if let (Some(va), Some(vb)) = (ca.as_f64(), cb.as_f64()) {
                        sum += (va - vb).abs();
                    }
                }
                sum.sqrt()
            }
        }
    }
}
