use banyan_data::DataError;

/// Errors from neighbor search and oversampling.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// Returned when resampling is called with no rows to oversample.
    #[error("no rows to oversample")]
    EmptyInput,

    /// Returned when a distance-method code has no known mapping.
    #[error("unknown distance method code {code}")]
    UnknownDistanceMethod {
        /// The unrecognized code.
        code: i64,
    },

    /// A dataset invariant violation surfaced by the facade.
    #[error(transparent)]
    Data(#[from] DataError),
}
