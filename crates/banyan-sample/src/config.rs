//! JSON configuration shared by the oversamplers.

use std::path::PathBuf;

/// Default neighborhood size.
pub const DEF_K: usize = 5;
/// Default oversampling percentage.
pub const DEF_PERCENT_OVER: usize = 100;

/// Oversampler configuration as loaded from a JSON file.
///
/// # Defaults
///
/// | Parameter         | JSON field       | Default |
/// |-------------------|------------------|---------|
/// | `k`               | `K`              | 5       |
/// | `class_index`     | `ClassIndex`     | 0       |
/// | `class_minor`     | `ClassMinor`     | `""`    |
/// | `distance_method` | `DistanceMethod` | 0       |
/// | `percent_over`    | `PercentOver`    | 100     |
/// | `synthetic_file`  | `SyntheticFile`  | `None`  |
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct OversampleConfig {
    #[serde(rename = "K")]
    pub k: usize,
    #[serde(rename = "ClassIndex")]
    pub class_index: usize,
    #[serde(rename = "ClassMinor")]
    pub class_minor: String,
    #[serde(rename = "DistanceMethod")]
    pub distance_method: i64,
    #[serde(rename = "PercentOver")]
    pub percent_over: usize,
    #[serde(rename = "SyntheticFile")]
    pub synthetic_file: Option<PathBuf>,
}

impl Default for OversampleConfig {
    fn default() -> Self {
        Self {
            k: DEF_K,
            class_index: 0,
            class_minor: String::new(),
            distance_method: 0,
            percent_over: DEF_PERCENT_OVER,
            synthetic_file: None,
        }
    }
}
