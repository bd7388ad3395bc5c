//! Configuration builders for the forest trainers.

use std::path::PathBuf;

/// Default number of trees in a Random Forest.
pub const DEF_NUM_TREE: usize = 100;
/// Default bootstrap percentage.
pub const DEF_PERCENT_BOOT: usize = 66;
/// Default number of cascade stages.
pub const DEF_NUM_STAGE: usize = 200;
/// Default true-positive-rate threshold for cascade early stopping.
pub const DEF_TP_RATE: f64 = 0.9;
/// Default true-negative-rate threshold for cascade early stopping.
pub const DEF_TN_RATE: f64 = 0.7;
/// Default number of trees per cascade stage.
pub const DEF_STAGE_TREE: usize = 1;
/// Default cascade statistics file.
pub const DEF_STATS_FILE: &str = "cascade.stats";

fn default_seed() -> u64 {
    42
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*`
/// methods, or deserialize from the JSON field names below. Zero values
/// fall back to the defaults when training starts.
///
/// # Defaults
///
/// | Parameter          | JSON field       | Default            |
/// |--------------------|------------------|--------------------|
/// | `n_trees`          | `NTree`          | 100                |
/// | `n_random_feature` | `NRandomFeature` | ⌊√(ncol − 1)⌋      |
/// | `percent_boot`     | `PercentBoot`    | 66                 |
/// | `run_oob`          | `RunOOB`         | `false`            |
/// | `oob_stats_file`   | `OOBStatsFile`   | `None`             |
/// | `perf_file`        | `PerfFile`       | `None`             |
/// | `seed`             | (builder only)   | 42                 |
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    #[serde(rename = "NTree")]
    pub(crate) n_trees: usize,
    #[serde(rename = "NRandomFeature")]
    pub(crate) n_random_feature: usize,
    #[serde(rename = "PercentBoot")]
    pub(crate) percent_boot: usize,
    #[serde(rename = "RunOOB")]
    pub(crate) run_oob: bool,
    #[serde(rename = "OOBStatsFile")]
    pub(crate) oob_stats_file: Option<PathBuf>,
    #[serde(rename = "PerfFile")]
    pub(crate) perf_file: Option<PathBuf>,
    #[serde(skip, default = "default_seed")]
    pub(crate) seed: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_trees: DEF_NUM_TREE,
            n_random_feature: 0,
            percent_boot: DEF_PERCENT_BOOT,
            run_oob: false,
            oob_stats_file: None,
            perf_file: None,
            seed: default_seed(),
        }
    }
}

impl RandomForestConfig {
    /// Create a config with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of trees (0 falls back to the default).
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the per-tree feature subsample size (0 resolves to
    /// ⌊√(ncol − 1)⌋ at training time).
    #[must_use]
    pub fn with_n_random_feature(mut self, n_random_feature: usize) -> Self {
        self.n_random_feature = n_random_feature;
        self
    }

    /// Set the bootstrap percentage (0 falls back to the default).
    #[must_use]
    pub fn with_percent_boot(mut self, percent_boot: usize) -> Self {
        self.percent_boot = percent_boot;
        self
    }

    /// Enable or disable writing per-tree OOB statistics.
    #[must_use]
    pub fn with_run_oob(mut self, run_oob: bool) -> Self {
        self.run_oob = run_oob;
        self
    }

    /// Set the OOB statistics file path.
    #[must_use]
    pub fn with_oob_stats_file(mut self, path: Option<PathBuf>) -> Self {
        self.oob_stats_file = path;
        self
    }

    /// Set the performance file path.
    #[must_use]
    pub fn with_perf_file(mut self, path: Option<PathBuf>) -> Self {
        self.perf_file = path;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the feature subsample size (0 = resolve at training time).
    #[must_use]
    pub fn n_random_feature(&self) -> usize {
        self.n_random_feature
    }

    /// Return the bootstrap percentage.
    #[must_use]
    pub fn percent_boot(&self) -> usize {
        self.percent_boot
    }

    /// Return whether OOB statistics are written.
    #[must_use]
    pub fn run_oob(&self) -> bool {
        self.run_oob
    }

    /// Return the OOB statistics file path, if any.
    #[must_use]
    pub fn oob_stats_file(&self) -> Option<&PathBuf> {
        self.oob_stats_file.as_ref()
    }

    /// Return the performance file path, if any.
    #[must_use]
    pub fn perf_file(&self) -> Option<&PathBuf> {
        self.perf_file.as_ref()
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Resolve zero/invalid fields against the column count.
    pub(crate) fn resolve(&self, column_count: usize) -> (usize, usize, usize) {
        let n_trees = if self.n_trees == 0 {
            DEF_NUM_TREE
        } else {
            self.n_trees
        };
        let percent_boot = if self.percent_boot == 0 {
            DEF_PERCENT_BOOT
        } else {
            self.percent_boot
        };
        let n_random_feature = if self.n_random_feature == 0 {
            (((column_count.saturating_sub(1)) as f64).sqrt() as usize).max(1)
        } else {
            self.n_random_feature
        };
        (n_trees, n_random_feature, percent_boot)
    }
}

/// Configuration for Cascaded Random Forest training.
///
/// # Defaults
///
/// | Parameter          | JSON field       | Default           |
/// |--------------------|------------------|-------------------|
/// | `n_stages`         | `NStage`         | 200               |
/// | `tp_rate`          | `TPRate`         | 0.9               |
/// | `tn_rate`          | `TNRate`         | 0.7               |
/// | `n_trees`          | `NTree`          | 1                 |
/// | `n_random_feature` | `NRandomFeature` | ⌊√(ncol − 1)⌋     |
/// | `percent_boot`     | `PercentBoot`    | 66                |
/// | `stats_file`       | `StatsFile`      | `cascade.stats`   |
/// | `seed`             | (builder only)   | 42                |
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    #[serde(rename = "NStage")]
    pub(crate) n_stages: usize,
    #[serde(rename = "TPRate")]
    pub(crate) tp_rate: f64,
    #[serde(rename = "TNRate")]
    pub(crate) tn_rate: f64,
    #[serde(rename = "NTree")]
    pub(crate) n_trees: usize,
    #[serde(rename = "NRandomFeature")]
    pub(crate) n_random_feature: usize,
    #[serde(rename = "PercentBoot")]
    pub(crate) percent_boot: usize,
    #[serde(rename = "StatsFile")]
    pub(crate) stats_file: Option<PathBuf>,
    #[serde(skip, default = "default_seed")]
    pub(crate) seed: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            n_stages: DEF_NUM_STAGE,
            tp_rate: DEF_TP_RATE,
            tn_rate: DEF_TN_RATE,
            n_trees: DEF_STAGE_TREE,
            n_random_feature: 0,
            percent_boot: DEF_PERCENT_BOOT,
            stats_file: None,
            seed: default_seed(),
        }
    }
}

impl CascadeConfig {
    /// Create a config with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of stages (0 falls back to the default).
    #[must_use]
    pub fn with_n_stages(mut self, n_stages: usize) -> Self {
        self.n_stages = n_stages;
        self
    }

    /// Set the per-stage TP-rate threshold (outside (0, 1) falls back).
    #[must_use]
    pub fn with_tp_rate(mut self, tp_rate: f64) -> Self {
        self.tp_rate = tp_rate;
        self
    }

    /// Set the per-stage TN-rate threshold (outside (0, 1) falls back).
    #[must_use]
    pub fn with_tn_rate(mut self, tn_rate: f64) -> Self {
        self.tn_rate = tn_rate;
        self
    }

    /// Set the number of trees per stage (0 falls back to the default).
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the per-tree feature subsample size (0 resolves to
    /// ⌊√(ncol − 1)⌋ at training time).
    #[must_use]
    pub fn with_n_random_feature(mut self, n_random_feature: usize) -> Self {
        self.n_random_feature = n_random_feature;
        self
    }

    /// Set the bootstrap percentage (0 falls back to the default).
    #[must_use]
    pub fn with_percent_boot(mut self, percent_boot: usize) -> Self {
        self.percent_boot = percent_boot;
        self
    }

    /// Set the stage statistics file.
    #[must_use]
    pub fn with_stats_file(mut self, path: Option<PathBuf>) -> Self {
        self.stats_file = path;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of stages.
    #[must_use]
    pub fn n_stages(&self) -> usize {
        self.n_stages
    }

    /// Return the TP-rate threshold.
    #[must_use]
    pub fn tp_rate(&self) -> f64 {
        self.tp_rate
    }

    /// Return the TN-rate threshold.
    #[must_use]
    pub fn tn_rate(&self) -> f64 {
        self.tn_rate
    }

    /// Return the number of trees per stage.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the stage statistics file, if any.
    #[must_use]
    pub fn stats_file(&self) -> Option<&PathBuf> {
        self.stats_file.as_ref()
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Resolve zero/invalid fields.
    pub(crate) fn resolved(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.n_stages == 0 {
            cfg.n_stages = DEF_NUM_STAGE;
        }
        if cfg.tp_rate <= 0.0 || cfg.tp_rate >= 1.0 {
            cfg.tp_rate = DEF_TP_RATE;
        }
        if cfg.tn_rate <= 0.0 || cfg.tn_rate >= 1.0 {
            cfg.tn_rate = DEF_TN_RATE;
        }
        if cfg.n_trees == 0 {
            cfg.n_trees = DEF_STAGE_TREE;
        }
        if cfg.percent_boot == 0 {
            cfg.percent_boot = DEF_PERCENT_BOOT;
        }
        cfg
    }

    /// The Random Forest configuration used inside each stage.
    pub(crate) fn stage_forest_config(&self) -> RandomForestConfig {
        RandomForestConfig::new()
            .with_n_trees(self.n_trees)
            .with_n_random_feature(self.n_random_feature)
            .with_percent_boot(self.percent_boot)
            .with_seed(self.seed)
    }
}
