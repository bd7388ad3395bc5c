//! Typed tabular data for the banyan learners.
//!
//! Provides the dataset facade the classifiers and oversamplers train on:
//! typed cell values, a column schema with one designated class column,
//! and a row-ordered [`Dataset`] with the selection, partitioning, and
//! random-pick operations the learning pipeline needs.

mod dataset;
mod error;
mod row;
mod schema;
mod value;

pub use dataset::{Dataset, RandomPick};
pub use error::DataError;
pub use row::Row;
pub use schema::{Attribute, Schema};
pub use value::{SplitValue, Value, ValueKind};
