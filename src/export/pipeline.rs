//! The persisted transform + predict function

use crate::data::FeatureFrame;
use crate::error::{CardioError, Result};
use crate::preprocessing::{AlignmentReport, DataPreprocessor};
use crate::training::{ForestParams, ModelMetrics, TrainedModel, TrainingOutcome};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Descriptive data stored next to the fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub model_type: String,
    pub target_name: String,
    pub trained_at: DateTime<Utc>,
    /// Version of the crate that wrote the artifact
    pub crate_version: String,
    pub random_state: u64,
    /// Input columns in fitted order
    pub input_features: Vec<String>,
    /// Columns of the model matrix
    pub output_features: Vec<String>,
    pub cv_scores: Vec<f64>,
    pub cv_mean_f1: f64,
    pub cv_std_f1: f64,
    pub test_metrics: ModelMetrics,
    pub n_train: usize,
    pub n_test: usize,
}

/// Fitted preprocessor, fitted classifier and the chosen hyperparameters.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    preprocessor: DataPreprocessor,
    model: TrainedModel,
    params: ForestParams,
    metadata: PipelineMetadata,
}

impl TrainedPipeline {
    pub fn new(
        preprocessor: DataPreprocessor,
        model: TrainedModel,
        params: ForestParams,
        metadata: PipelineMetadata,
    ) -> Self {
        Self { preprocessor, model, params, metadata }
    }

    /// Assemble the pipeline from a finished selection run
    pub fn from_outcome(outcome: TrainingOutcome, target_name: &str, random_state: u64) -> Self {
        let best = outcome.report.best();
        let metadata = PipelineMetadata {
            model_type: outcome.model.name().to_string(),
            target_name: target_name.to_string(),
            trained_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            random_state,
            input_features: outcome
                .preprocessor
                .spec()
                .columns()
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            output_features: outcome.preprocessor.output_feature_names(),
            cv_scores: best.cv.scores.clone(),
            cv_mean_f1: best.cv.mean_score,
            cv_std_f1: best.cv.std_score,
            test_metrics: outcome.test_metrics.clone(),
            n_train: outcome.n_train,
            n_test: outcome.n_test,
        };
        Self::new(outcome.preprocessor, outcome.model, outcome.best_params, metadata)
    }

    /// Predicted labels (0 or 1) for every row
    pub fn predict(&self, frame: &FeatureFrame) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(frame)?;
        self.model.predict(&x)
    }

    /// Probability of the positive class per row, `None` when the model has no
    /// probability estimate
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Option<Array1<f64>>> {
        let x = self.preprocessor.transform(frame)?;
        self.positive_proba(&x)
    }

    /// Labels and positive-class probabilities from a single transform
    pub fn predict_with_proba(&self, frame: &FeatureFrame) -> Result<(Array1<f64>, Option<Array1<f64>>)> {
        let x = self.preprocessor.transform(frame)?;
        let labels = self.model.predict(&x)?;
        Ok((labels, self.positive_proba(&x)?))
    }

    fn positive_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        let proba = match self.model.predict_proba(x)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let positive = self
            .model
            .classes()
            .iter()
            .position(|&c| c == 1.0)
            .ok_or_else(|| CardioError::Inference("Model was not fitted with a positive class".to_string()))?;
        Ok(Some(proba.column(positive).to_owned()))
    }

    pub fn check_alignment(&self, frame: &FeatureFrame) -> Result<AlignmentReport> {
        self.preprocessor.check_alignment(frame)
    }

    pub fn preprocessor(&self) -> &DataPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }
}
