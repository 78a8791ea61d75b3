//! One-hot encoding for categorical columns

use crate::error::{CardioError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder with a sorted vocabulary per column.
///
/// Values outside the vocabulary (and missing values) encode as an all-zero
/// block rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, columns: &[Vec<Option<String>>]) -> Result<&mut Self> {
        self.categories = columns
            .iter()
            .map(|col| {
                col.iter()
                    .flatten()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Width of the encoded block for `column`
    pub fn width(&self, column: usize) -> usize {
        self.categories.get(column).map_or(0, Vec::len)
    }

    /// Total output width over all columns
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn categories(&self, column: usize) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }

    /// Write the one-hot block for `value` into `out` (`out.len() == width(column)`)
    pub fn encode_into(&self, column: usize, value: Option<&str>, out: &mut [f64]) -> Result<()> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }
        let vocab = self.categories.get(column).ok_or_else(|| {
            CardioError::Preprocessing(format!("Encoder has no column at position {}", column))
        })?;
        if out.len() != vocab.len() {
            return Err(CardioError::ShapeError {
                expected: format!("{} one-hot slots", vocab.len()),
                actual: format!("{}", out.len()),
            });
        }
        out.iter_mut().for_each(|v| *v = 0.0);
        if let Some(value) = value {
            if let Ok(idx) = vocab.binary_search_by(|c| c.as_str().cmp(value)) {
                out[idx] = 1.0;
            }
        }
        Ok(())
    }

    /// Output names `<column>_<category>` for the given input names
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        input_names
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{}_{}", name, c)))
            .collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
