//! Decision-tree classification: CART, Random Forest, Cascaded Random Forest.
//!
//! Provides a Gini-gain split engine over mixed continuous/nominal
//! attributes, a binary CART learner built on it, a bagging Random Forest
//! with out-of-bag evaluation, and a cascaded ensemble that reshapes its
//! training set between stages and classifies by weighted vote.

mod cart;
mod cascade;
mod config;
mod confusion;
mod error;
mod forest;
mod gini;
mod stats;
mod tree;

pub use cart::CartConfig;
pub use cascade::Cascade;
pub use config::{
    CascadeConfig, DEF_NUM_STAGE, DEF_NUM_TREE, DEF_PERCENT_BOOT, DEF_STAGE_TREE, DEF_STATS_FILE,
    DEF_TN_RATE, DEF_TP_RATE, RandomForestConfig,
};
pub use confusion::ConfusionMatrix;
pub use error::ForestError;
pub use forest::RandomForest;
pub use gini::{GiniScan, find_max_gain, find_min_gini_index, gini_of};
pub use stats::{Stat, StatWriter};
pub use tree::{DecisionTree, Node};
