//! Model training
//!
//! - Weighted Gini decision trees and a class-balanced random forest
//! - Stratified hold-out and k-fold splitting
//! - Grid search scored by positive-class F1

mod config;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod grid_search;
pub mod random_forest;

pub use config::TrainingConfig;
pub use cross_validation::{stratified_train_test_split, CVResults, CVSplit, CrossValidator};
pub use decision_tree::{DecisionTree, TreeNode};
pub use grid_search::{CandidateScore, ForestParams, ModelSelector, ParameterGrid, SelectionReport, TrainingOutcome};
pub use models::{ModelMetrics, TrainedModel};
pub use random_forest::{ClassWeight, MaxFeatures, RandomForest};
