use crate::value::ValueKind;

/// Errors from dataset construction and mutation.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when a schema is declared with zero columns.
    #[error("schema must have at least one column")]
    EmptySchema,

    /// Returned when the class index does not address a column.
    #[error("class index {index} out of range for {column_count} columns")]
    ClassIndexOutOfRange {
        /// The invalid class index.
        index: usize,
        /// The number of columns in the schema.
        column_count: usize,
    },

    /// Returned when the class column is not nominal.
    ///
    /// Classification needs an enumerable class value space, so the class
    /// column must carry nominal values.
    #[error("class column {index} must be nominal with a non-empty value space")]
    ClassNotNominal {
        /// The class column index.
        index: usize,
    },

    /// Returned when a row's length differs from the column count.
    #[error("row has {got} cells, schema has {expected} columns")]
    RowLengthMismatch {
        /// The number of columns in the schema.
        expected: usize,
        /// The number of cells in the offending row.
        got: usize,
    },

    /// Returned when a cell's type differs from its column's type.
    #[error("cell in column {column} is {got:?}, column is {expected:?}")]
    CellKindMismatch {
        /// The zero-based column index.
        column: usize,
        /// The column's declared kind.
        expected: ValueKind,
        /// The cell's actual kind.
        got: ValueKind,
    },

    /// Returned when a nominal cell holds a value outside the column's
    /// value space.
    #[error("value {value:?} not in value space of column {column}")]
    NominalValueUnknown {
        /// The zero-based column index.
        column: usize,
        /// The offending cell value.
        value: String,
    },
}
