//! Minority-class oversampling via k-nearest-neighbor interpolation.
//!
//! Provides a pluggable-distance KNN engine, the classic SMOTE
//! oversampler, and the local-neighborhood LN-SMOTE variant that
//! conditions interpolation on the safe level of both endpoints.

mod config;
mod error;
mod knn;
mod lnsmote;
mod smote;

pub use config::OversampleConfig;
pub use error::SampleError;
pub use knn::{DistanceMethod, Knn, Neighbor, Neighbors};
pub use lnsmote::LnSmote;
pub use smote::Smote;
