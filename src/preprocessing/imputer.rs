//! Missing value imputation for numeric columns

use crate::error::{CardioError, Result};
use serde::{Deserialize, Serialize};

/// Strategy for filling missing values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Middle value of the observed data (average of the two middle values for even counts)
    Median,
    Mean,
    /// Fixed fill value
    Constant(f64),
}

/// Per-column imputer, fitted positionally over the numeric block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<f64>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per column. A column with no observed values fills with 0.
    pub fn fit(&mut self, columns: &[Vec<Option<f64>>]) -> Result<&mut Self> {
        self.fill_values = columns
            .iter()
            .map(|col| {
                let observed: Vec<f64> = col.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
                match self.strategy {
                    ImputeStrategy::Constant(c) => c,
                    _ if observed.is_empty() => 0.0,
                    ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                    ImputeStrategy::Median => median(observed),
                }
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Value to use at `column` for `value`
    pub fn impute(&self, column: usize, value: Option<f64>) -> Result<f64> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }
        let fill = self.fill_values.get(column).copied().ok_or_else(|| {
            CardioError::Preprocessing(format!("Imputer has no column at position {}", column))
        })?;
        Ok(match value {
            Some(v) if !v.is_nan() => v,
            _ => fill,
        })
    }

    pub fn fill_values(&self) -> &[f64] {
        &self.fill_values
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
