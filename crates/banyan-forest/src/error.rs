use std::path::PathBuf;

use banyan_data::DataError;

/// Errors from tree, forest, and cascade operations.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when training is called with no rows.
    #[error("training dataset has zero rows")]
    EmptyDataset,

    /// Returned when the split search finds no attribute with positive
    /// gain. Recovered locally by the forest trainers, which retry with
    /// a fresh bootstrap; never surfaced from them.
    #[error("no attribute with positive gain on current subset")]
    TreeGrowthFailure,

    /// Returned when repeated bootstraps keep failing to grow a tree.
    #[error("tree growth failed after {attempts} bootstrap attempts")]
    TreeGrowthExhausted {
        /// Number of bootstrap-and-grow attempts made.
        attempts: usize,
    },

    /// Returned when a statistics line cannot be appended.
    #[error("failed to append statistics to {path}")]
    StatsIo {
        /// The statistics file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A dataset invariant violation surfaced by the facade.
    #[error(transparent)]
    Data(#[from] DataError),
}
