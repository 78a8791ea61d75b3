//! Application state management

use super::ServerConfig;
use crate::error::Result;
use crate::explainability::ExplanationService;
use crate::export::TrainedPipeline;
use crate::inference::{InferenceConfig, PredictionService};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Application state shared across handlers. Built once, never mutated.
pub struct AppState {
    pub config: ServerConfig,
    pub pipeline: Arc<TrainedPipeline>,
    pub predictor: PredictionService,
    pub explainer: ExplanationService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, pipeline: Arc<TrainedPipeline>) -> Self {
        let inference = InferenceConfig::new().with_drift_policy(config.drift_policy);
        let explainer = ExplanationService::new(inference.explanation_top_k);
        Self {
            predictor: PredictionService::new(Arc::clone(&pipeline), inference),
            explainer,
            pipeline,
            config,
            started_at: Utc::now(),
        }
    }

    /// Load the artifact named by `config.model_path` and build the state
    pub fn load(config: ServerConfig) -> Result<Self> {
        let pipeline = TrainedPipeline::load(&config.model_path)?;
        Ok(Self::new(config, Arc::new(pipeline)))
    }
}
