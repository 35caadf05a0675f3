//! Health-risk - classification pipeline for patient risk levels
//!
//! This crate provides:
//! - Data cleaning (numeric coercion, IQR outlier trimming, zero repair)
//! - Categorical encoding against a persisted feature schema
//! - Stratified splitting, SMOTE oversampling and standard scaling
//! - Model training with optional cross-validated grid search
//! - A predictor that scores single patient records
//! - CLI and web front-ends
//!
//! # Modules
//!
//! - [`preprocessing`] - Cleaning, encoding, splitting, scaling
//! - [`synthetic`] - SMOTE oversampling
//! - [`training`] - Classifiers, grid search, training engine
//! - [`inference`] - Artifact loading and prediction
//! - [`server`] - HTTP server with web form and JSON API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod synthetic;
pub mod training;
pub mod inference;

// Services
pub mod server;
pub mod cli;

pub use error::{RiskError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{RiskError, Result};

    pub use crate::preprocessing::{
        DataCleaner, DataPreprocessor, FeatureSchema, LabelEncoder, OneHotEncoder,
        PreparedData, PreprocessingConfig, StandardScaler,
    };

    pub use crate::synthetic::{Sampler, SMOTE};

    pub use crate::training::{
        ClassificationReport, ModelName, ModelParams, ParamGrid, TrainEngine, TrainedModel,
        TrainingConfig,
    };

    pub use crate::inference::{PatientInput, PatientRecord, Prediction, Predictor};
}
