//! Application state management

use crate::inference::Predictor;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Application state shared across handlers.
///
/// Everything here is read-only after startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    /// Contents of `metrics.json`, when the artifacts directory has one
    pub training_metrics: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self {
            predictor,
            training_metrics: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_training_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.training_metrics = Some(metrics);
        self
    }

    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}
