//! Inference module
//!
//! Loads the artifacts written by a training run and scores single patient
//! records against the canonical feature schema.

mod artifacts;
mod engine;
mod record;

pub use artifacts::{
    ArtifactSet, ArtifactStore, COLUMNS_FILE, LABELS_FILE, METRICS_FILE, MODEL_FILE, SCALER_FILE,
};
pub use engine::{format_percent, ModelInfo, Prediction, Predictor};
pub use record::{bmi, AlcoholLevel, PatientInput, PatientRecord, Sex, YesNo};
