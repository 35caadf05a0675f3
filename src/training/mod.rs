//! Model training module
//!
//! Multiclass classifiers selectable by name:
//! - Decision trees and Random Forests
//! - XGBoost-style gradient boosting (softmax objective)
//! - Multinomial logistic regression
//! - Support Vector Machines (one-vs-rest)
//!
//! plus grid search over stratified folds and the end-to-end [`TrainEngine`].

mod config;
mod engine;
mod grid_search;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod linear_models;
pub mod metrics;
pub mod params;
pub mod random_forest;
pub mod svm;
pub mod xgboost;

pub use config::{ModelName, TrainingConfig};
pub use engine::{TrainEngine, TrainingOutcome, TrainingSummary};
pub use grid_search::{CandidateScore, GridSearch, GridSearchResult};
pub use models::TrainedModel;
pub use cross_validation::{CVSplit, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, MaxFeatures, TreeNode};
pub use linear_models::LogisticRegression;
pub use metrics::{weighted_f1_score, ClassMetrics, ClassificationReport};
pub use params::{expand_grid, merge_params, ModelParams, ParamGrid};
pub use random_forest::RandomForest;
pub use svm::{Gamma, KernelKind, SVMConfig, SVC};
pub use xgboost::{XGBClassifier, XGBoostConfig};
