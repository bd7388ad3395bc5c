//! Synthetic Minority Oversampling (SMOTE).
//!
//! For each minority row, interpolates new samples toward randomly
//! chosen members of its k-neighborhood inside the minority set.

use rand::Rng;
use tracing::{debug, instrument};

use banyan_data::{Dataset, Row, Value};

use crate::config::{DEF_K, DEF_PERCENT_OVER, OversampleConfig};
use crate::error::SampleError;
use crate::knn::{DistanceMethod, Knn};

/// SMOTE parameters.
///
/// # Defaults
///
/// | Parameter         | Default     |
/// |-------------------|-------------|
/// | `k`               | 5           |
/// | `percent_over`    | 100         |
/// | `distance_method` | `Euclidean` |
#[derive(Debug, Clone)]
pub struct Smote {
    k: usize,
    percent_over: usize,
    distance_method: DistanceMethod,
}

impl Default for Smote {
    fn default() -> Self {
        Self {
            k: DEF_K,
            percent_over: DEF_PERCENT_OVER,
            distance_method: DistanceMethod::Euclidean,
        }
    }
}

impl Smote {
    /// Create a SMOTE runner with the documented defaults.
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
            distance_method: DistanceMethod::from_code(config.distance_method)?,
        })
    }

    /// Set the neighborhood size (0 falls back to the default).
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = if k == 0 { DEF_K } else { k };
        self
    }

    /// Set the oversampling percentage (0 falls back to the default).
    #[must_use]
    pub fn with_percent_over(mut self, percent_over: usize) -> Self {
        self.percent_over = percent_over;
        self
    }

    /// Generate synthetic rows from a minority-only dataset.
    ///
    /// Below 100 percent the minority set is first reduced to
    /// `⌊percent/100 · |D|⌋` rows picked without replacement and the
    /// percentage resets to 100; the synthetic count is then
    /// `⌊percent/100⌋` per remaining row.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::EmptyInput`] when `minority` has no rows.
    #[instrument(skip_all, fields(n_minority = minority.len()))]
    pub fn resample(
        &self,
        minority: &Dataset,
        rng: &mut impl Rng,
    ) -> Result<Dataset, SampleError> {
        if minority.is_empty() {
            return Err(SampleError::EmptyInput);
        }

        let mut working = minority.clone();
        let mut percent = if self.percent_over == 0 {
            DEF_PERCENT_OVER
        } else {
            self.percent_over
        };
        if percent < 100 {
            let keep = percent * working.len() / 100;
            working = working.random_pick(keep, false, rng).picked;
            percent = 100;
        }
        let per_row = percent / 100;

        let knn = Knn {
            k: self.k,
            class_index: working.class_index(),
            distance_method: self.distance_method,
        };

        let mut synthetic = minority.clone_empty();
        for (x, p) in working.rows().iter().enumerate() {
            let neighbors = knn.neighbors(working.rows(), p, Some(x));
            if neighbors.is_empty() {
                continue;
            }
            for _ in 0..per_row {
                let pos = rng.gen_range(0..neighbors.len());
                if let Some(q) = neighbors.get(pos) {
                    let row = interpolate(p, &q.row, working.class_index(), rng);
                    synthetic.push_row(row)?;
                }
            }
        }

        debug!(n_synthetic = synthetic.len(), "smote resampling complete");
        Ok(synthetic)
    }
}

/// Interpolate one synthetic row between `p` and `q` with a fresh
/// uniform gap per attribute; the class cell and nominal cells copy `p`.
fn interpolate(p: &Row, q: &Row, class_index: usize, rng: &mut impl Rng) -> Row {
    let cells = p
        .cells()
        .enumerate()
        .map(|(i, cell)| {
            if i == class_index {
                return cell.clone();
            }
            match (cell.as_f64(), q.cell(i).and_then(Value::as_f64)) {
                (Some(pv), Some(qv)) => {
                    let gap: f64 = rng.gen_range(0.0..1.0);
                    Value::from_f64(cell.kind(), pv + gap * (qv - pv))
                        .unwrap_or_else(|| cell.clone())
                }
                _ => cell.clone(),
            }
        })
        .collect();
    Row::new(cells)
}
