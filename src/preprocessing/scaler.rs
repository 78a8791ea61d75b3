//! Feature scaling implementations

use crate::error::{CardioError, Result};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score): (x - mean) / std, population std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// No scaling
    None,
}

/// Parameters for a fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean or min
    scale: f64,  // std or range
}

/// Feature scaler over the numeric block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit one set of parameters per (already imputed) column
    pub fn fit(&mut self, columns: &[Vec<f64>]) -> Result<&mut Self> {
        self.params = columns.iter().map(|col| self.compute_params(col)).collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn scale(&self, column: usize, value: f64) -> Result<f64> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }
        let p = self.params.get(column).ok_or_else(|| {
            CardioError::Preprocessing(format!("Scaler has no column at position {}", column))
        })?;
        Ok((value - p.center) / p.scale)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn compute_params(&self, col: &[f64]) -> ScalerParams {
        if col.is_empty() {
            return ScalerParams { center: 0.0, scale: 1.0 };
        }
        match self.scaler_type {
            ScalerType::Standard => {
                let n = col.len() as f64;
                let mean = col.iter().sum::<f64>() / n;
                let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            }
            ScalerType::MinMax => {
                let min = col.iter().copied().fold(f64::INFINITY, f64::min);
                let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                ScalerParams {
                    center: min,
                    scale: if range == 0.0 { 1.0 } else { range },
                }
            }
            ScalerType::None => ScalerParams { center: 0.0, scale: 1.0 },
        }
    }
}
