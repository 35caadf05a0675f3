//! Data preprocessing module
//!
//! Turns the raw patient table into model-ready matrices:
//! - Numeric coercion, identifier removal and IQR outlier trimming
//! - Zero repair for columns where zero means "not recorded"
//! - One-hot feature encoding and label-encoded target
//! - Stratified train/test split, SMOTE on the training side
//! - Standard scaling

mod cleaner;
mod config;
mod encoder;
mod pipeline;
mod scaler;
mod split;
pub mod outlier;

pub use cleaner::{CleaningReport, ColumnTrim, DataCleaner};
pub use config::PreprocessingConfig;
pub use encoder::{
    column_as_strings, get_dummies, one_hot_columns, partition_feature_columns, FeatureSchema,
    LabelEncoder, OneHotEncoder,
};
pub use outlier::IqrBounds;
pub use pipeline::{load_csv, DataPreprocessor, PreparedData};
pub use scaler::{ScalerParams, StandardScaler};
pub use split::{stratified_split, stratified_split_indices, SplitIndices, TrainTestSplit};
