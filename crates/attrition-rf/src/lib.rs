//! Random forest classification for tabular HR data.
//!
//! CART trees grown on bootstrap samples with Gini impurity, trained in
//! parallel via rayon from a single master seed. Also carries the
//! evaluation helpers used on a holdout split: stratified splitting,
//! confusion matrix with per-class metrics, and ROC-AUC.

mod config;
mod confusion;
mod error;
mod forest;
mod holdout;
mod importance;
mod node;
mod predict;
mod result;
mod roc;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForest;
pub use holdout::StratifiedHoldout;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use roc::roc_auc;
pub use serialize::FORMAT_VERSION;
pub use tree::DecisionTree;
