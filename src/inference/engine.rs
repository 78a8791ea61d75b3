//! Request-time prediction against a loaded pipeline

use super::coercion::RequestRecord;
use super::config::{DriftPolicy, InferenceConfig};
use crate::error::{CardioError, Result};
use crate::export::TrainedPipeline;
use crate::preprocessing::AlignmentReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Label and optional positive-class probability for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: u8,
    pub probability: Option<f64>,
}

/// Turns request records into predictions. Pure apart from logging.
#[derive(Debug, Clone)]
pub struct PredictionService {
    pipeline: Arc<TrainedPipeline>,
    config: InferenceConfig,
}

impl PredictionService {
    pub fn new(pipeline: Arc<TrainedPipeline>, config: InferenceConfig) -> Self {
        Self { pipeline, config }
    }

    pub fn pipeline(&self) -> &TrainedPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Parse a raw body and predict
    pub fn predict_body(&self, body: &[u8]) -> Result<PredictionResult> {
        let record = RequestRecord::from_body(body)?;
        self.predict(&record)
    }

    pub fn predict(&self, record: &RequestRecord) -> Result<PredictionResult> {
        let frame = record.to_frame();

        let report = self.pipeline.check_alignment(&frame)?;
        if !report.is_clean() {
            self.handle_drift(&report)?;
        }

        let (labels, proba) = self.pipeline.predict_with_proba(&frame)?;
        let label = labels
            .first()
            .copied()
            .ok_or_else(|| CardioError::Inference("Model returned no prediction".to_string()))?;

        let probability = proba
            .and_then(|p| p.first().copied())
            .map(|p| round_to(p, self.config.probability_decimals));

        debug!(prediction = label, probability = ?probability, "Prediction computed");
        Ok(PredictionResult {
            prediction: if label >= 0.5 { 1 } else { 0 },
            probability,
        })
    }

    fn handle_drift(&self, report: &AlignmentReport) -> Result<()> {
        warn!(
            missing = ?report.missing,
            unexpected = ?report.unexpected,
            uncoercible = ?report.uncoercible,
            policy = %self.config.drift_policy,
            "Request does not match the trained schema"
        );
        match self.config.drift_policy {
            DriftPolicy::FillDefaults => Ok(()),
            DriftPolicy::Reject => Err(CardioError::RequestValidation(describe_drift(report))),
        }
    }
}

fn describe_drift(report: &AlignmentReport) -> String {
    let mut parts = Vec::new();
    if !report.missing.is_empty() {
        parts.push(format!("missing fields: {}", report.missing.join(", ")));
    }
    if !report.unexpected.is_empty() {
        parts.push(format!("unexpected fields: {}", report.unexpected.join(", ")));
    }
    if !report.uncoercible.is_empty() {
        parts.push(format!("non-numeric values in: {}", report.uncoercible.join(", ")));
    }
    format!("Request does not match the trained schema ({})", parts.join("; "))
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(1.0, 4), 1.0);
        assert_eq!(round_to(0.0, 4), 0.0);
    }

    #[test]
    fn test_describe_drift() {
        let report = AlignmentReport {
            missing: vec!["age".into()],
            unexpected: vec!["foo".into(), "bar".into()],
            uncoercible: vec![],
        };
        assert_eq!(
            describe_drift(&report),
            "Request does not match the trained schema (missing fields: age; unexpected fields: foo, bar)"
        );
    }
}
