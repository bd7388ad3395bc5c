//! Local-neighborhood SMOTE.
//!
//! Conditions each interpolation on the "safe level" (the number of
//! minority neighbors) of both endpoints, pulling synthetics toward
//! the safer side of the segment and refusing to synthesize inside
//! pure-majority neighborhoods.

use rand::Rng;
use tracing::{debug, instrument};

use banyan_data::{Dataset, Row, Value};

use crate::config::{DEF_K, OversampleConfig};
use crate::error::SampleError;
use crate::knn::{DistanceMethod, Knn, Neighbor, Neighbors};

/// LN-SMOTE parameters.
///
/// # Defaults
///
/// | Parameter         | Default     |
/// |-------------------|-------------|
/// | `k`               | 5           |
/// | `percent_over`    | 100         |
/// | `class_minor`     | `"1"`       |
/// | `distance_method` | `Euclidean` |
#[derive(Debug, Clone)]
pub struct LnSmote {
    k: usize,
    percent_over: usize,
    class_minor: String,
    distance_method: DistanceMethod,
}

impl Default for LnSmote {
    fn default() -> Self {
        Self {
            k: DEF_K,
            percent_over: 100,
            class_minor: "1".to_string(),
            distance_method: DistanceMethod::Euclidean,
        }
    }
}

impl LnSmote {
    /// Create an LN-SMOTE runner with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::UnknownDistanceMethod`] for an unmapped
    /// distance code.
    pub fn from_config(config: &OversampleConfig) -> Result<Self, SampleError> {
        Ok(Self {
            k: if config.k == 0 { DEF_K } else { config.k },
            percent_over: config.percent_over,
            class_minor: config.class_minor.clone(),
            distance_method: DistanceMethod::from_code(config.distance_method)?,
        })
    }

    /// Set the neighborhood size (0 falls back to the default).
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = if k == 0 { DEF_K } else { k };
        self
    }

    /// Set the oversampling percentage (clamped to at least 100).
    #[must_use]
    pub fn with_percent_over(mut self, percent_over: usize) -> Self {
        self.percent_over = percent_over;
        self
    }

    /// Name the minority class value.
    #[must_use]
    pub fn with_class_minor(mut self, class_minor: impl Into<String>) -> Self {
        self.class_minor = class_minor.into();
        self
    }

    /// Generate synthetic minority rows from the full dataset.
    ///
    /// Operates on the rows whose class equals `class_minor`, searching
    /// neighborhoods across the whole dataset. The percentage is clamped
    /// to at least 100, giving `⌊percent/100⌋` draws per minority row;
    /// each draw is kept only when the safe-level rule allows it.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::EmptyInput`] when no row carries the
    /// minority class.
    #[instrument(skip_all, fields(n_samples = dataset.len()))]
    pub fn resample(
        &self,
        dataset: &Dataset,
        rng: &mut impl Rng,
    ) -> Result<Dataset, SampleError> {
        let class_index = dataset.class_index();
        let rows = dataset.rows();

        let minority_indices: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.cell(class_index).and_then(Value::as_str) == Some(self.class_minor.as_str())
            })
            .map(|(i, _)| i)
            .collect();
        if minority_indices.is_empty() {
            return Err(SampleError::EmptyInput);
        }

        let per_row = self.percent_over.max(100) / 100;
        let knn = Knn {
            k: self.k,
            class_index,
            distance_method: self.distance_method,
        };

        let mut synthetic = dataset.clone_empty();
        for &pi in &minority_indices {
            let p = &rows[pi];
            let p_neighbors = knn.neighbors(rows, p, Some(pi));
            if p_neighbors.is_empty() {
                continue;
            }
            let slp = p_neighbors.count_where(class_index, &self.class_minor);

            for _ in 0..per_row {
                let pos = rng.gen_range(0..p_neighbors.len());
                let Some(q) = p_neighbors.get(pos) else {
                    continue;
                };
                let sln = self.neighbor_safe_level(&knn, rows, pi, q, class_index);

                // Synthesis is allowed only when at least one endpoint
                // has a minority neighbor.
                if slp == 0 && sln == 0 {
                    continue;
                }

                let delta = safe_level_gap(slp, sln, rng);
                let row = interpolate(p, &q.row, class_index, delta);
                synthetic.push_row(row)?;
            }
        }

        debug!(n_synthetic = synthetic.len(), "lnsmote resampling complete");
        Ok(synthetic)
    }

    /// Safe level of the chosen neighbor `q`: minority count in q's own
    /// k-neighborhood over the full dataset.
    ///
    /// When q is itself minority and `p` occupies one of its slots, that
    /// slot is refilled with the (k+1)-th nearest neighbor of q, the
    /// first one beyond the kept neighborhood, so p does not inflate
    /// its partner's safe level.
    fn neighbor_safe_level(
        &self,
        knn: &Knn,
        rows: &[Row],
        p_index: usize,
        q: &Neighbor,
        class_index: usize,
    ) -> usize {
        let q_all: Neighbors = knn.sorted_neighbors(rows, &q.row, Some(q.index));
        let mut q_neighbors = q_all.take(self.k);

        let q_is_minor =
            q.row.cell(class_index).and_then(Value::as_str) == Some(self.class_minor.as_str());
        if q_is_minor
            && let Some(pos) = q_neighbors.position_of_index(p_index)
            && let Some(replacement) = q_all.get(self.k)
        {
            q_neighbors.replace(pos, replacement.clone());
        }

        q_neighbors.count_where(class_index, &self.class_minor)
    }
}

/// The interpolation gap from the safe levels of both endpoints.
///
/// A partner with no minority neighborhood pins the synthetic onto `p`
/// (delta 0); otherwise the gap is biased toward whichever endpoint is
/// safer, uniform when they tie.
fn safe_level_gap(slp: usize, sln: usize, rng: &mut impl Rng) -> f64 {
    if sln == 0 && slp > 0 {
        return 0.0;
    }
    let ratio = slp as f64 / sln as f64;
    if ratio == 1.0 {
        rng.gen_range(0.0..1.0)
    } else if ratio > 1.0 {
        rng.gen_range(0.0..1.0) * (1.0 / ratio)
    } else {
        1.0 - rng.gen_range(0.0..1.0) * ratio
    }
}

/// Interpolate one synthetic row with a single delta for every numeric
/// non-class attribute; the class cell and nominal cells copy `p`.
fn interpolate(p: &Row, q: &Row, class_index: usize, delta: f64) -> Row {
    let cells = p
        .cells()
        .enumerate()
        .map(|(i, cell)| {
            if i == class_index {
                return cell.clone();
            }
            match (cell.as_f64(), q.cell(i).and_then(Value::as_f64)) {
                (Some(pv), Some(qv)) => Value::from_f64(cell.kind(), pv + delta * (qv - pv))
                    .unwrap_or_else(|| cell.clone()),
                _ => cell.clone(),
            }
        })
        .collect();
    Row::new(cells)
}
