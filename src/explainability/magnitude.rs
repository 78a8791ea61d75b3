//! Magnitude ranking: request fields ordered by the absolute value of their
//! numeric input, not by model attribution

use crate::error::{CardioError, Result};
use crate::inference::{coerce_value, Coerced, RequestRecord};
use serde::{Deserialize, Serialize};

/// One ranked field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub top_features: Vec<FeatureImportance>,
}

/// Ranks request fields by absolute numeric value
#[derive(Debug, Clone)]
pub struct ExplanationService {
    top_k: usize,
}

impl Default for ExplanationService {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ExplanationService {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn explain_body(&self, body: &[u8]) -> Result<ExplanationResult> {
        let record = RequestRecord::from_body(body)?;
        self.explain(&record)
    }

    /// Top fields by `|value|`, largest first; equal magnitudes keep request order.
    ///
    /// Every field must be numeric after coercion, otherwise the whole
    /// explanation fails naming the offending field.
    pub fn explain(&self, record: &RequestRecord) -> Result<ExplanationResult> {
        let mut ranked = record
            .fields()
            .map(|(name, value)| match coerce_value(value) {
                Coerced::Numeric(v) => Ok(FeatureImportance {
                    feature: name.to_string(),
                    importance: v.abs(),
                }),
                Coerced::Kept(kept) => Err(CardioError::ExplanationCompute(format!(
                    "Cannot compute magnitude of field '{}': {} is not numeric",
                    name, kept
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked.truncate(self.top_k);
        Ok(ExplanationResult { top_features: ranked })
    }
}
