//! Per-tree / per-stage classifier statistics and the append-only sink.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::confusion::ConfusionMatrix;
use crate::error::ForestError;

/// Scalar performance statistics of one tree or one cascade stage.
///
/// Rates with a zero denominator are the NaN sentinel, never a panic.
#[derive(Debug, Clone)]
pub struct Stat {
    /// Ordinal of the tree or stage this record describes.
    pub id: i64,
    /// TP / (TP + FN).
    pub tp_rate: f64,
    /// FP / (FP + TN).
    pub fp_rate: f64,
    /// TN / (TN + FP).
    pub tn_rate: f64,
    /// TP / (TP + FP).
    pub precision: f64,
    /// 2 * precision * recall / (precision + recall).
    pub f_measure: f64,
    /// Misclassification rate of the evaluation this stat came from.
    pub oob_error: f64,
    /// Running mean of the out-of-bag error up to this record.
    pub oob_error_mean: f64,
}

impl Stat {
    /// Derive the rate scalars from a confusion matrix.
    ///
    /// The OOB fields start at zero; the forest trainer fills them in
    /// as it accumulates per-tree errors.
    #[must_use]
    pub fn from_matrix(id: i64, cm: &ConfusionMatrix) -> Self {
        let tp = cm.tp() as f64;
        let fp = cm.fp() as f64;
        let tn = cm.tn() as f64;
        let fn_ = cm.fn_() as f64;

        let tp_rate = tp / (tp + fn_);
        let fp_rate = fp / (fp + tn);
        let tn_rate = tn / (tn + fp);
        let precision = tp / (tp + fp);
        let f_measure = 2.0 * precision * tp_rate / (precision + tp_rate);

        Self {
            id,
            tp_rate,
            fp_rate,
            tn_rate,
            precision,
            f_measure,
            oob_error: 0.0,
            oob_error_mean: 0.0,
        }
    }

    /// One line of the statistics file.
    #[must_use]
    pub fn csv_line(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            self.id, self.tp_rate, self.fp_rate, self.precision, self.f_measure,
            self.oob_error_mean
        )
    }
}

/// Append-only line-oriented statistics sink.
///
/// One record per tree or stage; the file is created on first append
/// and never truncated.
#[derive(Debug, Clone)]
pub struct StatWriter {
    path: PathBuf,
}

impl StatWriter {
    /// Create a writer targeting the given path.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Append one statistics record.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::StatsIo`] when the file cannot be opened
    /// or written.
    pub fn append(&self, stat: &Stat) -> Result<(), ForestError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ForestError::StatsIo {
                path: self.path.clone(),
                source: e,
            })?;
        writeln!(file, "{}", stat.csv_line()).map_err(|e| ForestError::StatsIo {
            path: self.path.clone(),
            source: e,
        })
    }
}
