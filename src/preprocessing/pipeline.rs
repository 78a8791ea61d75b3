//! Data preprocessing pipeline

use super::{
    config::PreprocessingConfig, encoder::OneHotEncoder, imputer::Imputer, scaler::Scaler,
    ColumnKind, FeatureSpec,
};
use crate::data::{FeatureFrame, FieldValue};
use crate::error::{CardioError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Differences between a frame and the fitted spec
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Fitted columns absent from the frame
    pub missing: Vec<String>,
    /// Frame columns the fitted schema does not know
    pub unexpected: Vec<String>,
    /// Numeric or passthrough columns holding text
    pub uncoercible: Vec<String>,
}

impl AlignmentReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.uncoercible.is_empty()
    }
}

/// Fitted column transformer.
///
/// Output layout is `[numeric | one-hot | passthrough]`, each block in the
/// original column order. Input columns are matched by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    spec: FeatureSpec,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    passthrough_columns: Vec<String>,
    imputer: Imputer,
    scaler: Scaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
    /// Seconds spent in the last fit call
    fit_time: Option<f64>,
}

impl DataPreprocessor {
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            imputer: Imputer::new(config.numeric_impute_strategy),
            scaler: Scaler::new(config.scaler_type),
            encoder: OneHotEncoder::new(),
            config,
            spec: FeatureSpec::default(),
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            passthrough_columns: Vec::new(),
            is_fitted: false,
            fit_time: None,
        }
    }

    /// Fit the transforms on `frame` using the column kinds in `spec`
    pub fn fit(&mut self, frame: &FeatureFrame, spec: &FeatureSpec) -> Result<&mut Self> {
        let start = Instant::now();

        if spec.is_empty() {
            return Err(CardioError::Preprocessing("Cannot fit on an empty feature spec".to_string()));
        }
        if let Some(absent) = spec.columns().iter().find(|c| frame.column_index(&c.name).is_none()) {
            return Err(CardioError::Preprocessing(format!(
                "Column '{}' is in the feature schema but not in the training frame",
                absent.name
            )));
        }

        self.spec = spec.clone();
        self.numeric_columns = spec.names_of(ColumnKind::Numeric);
        self.categorical_columns = spec.names_of(ColumnKind::Categorical);
        self.passthrough_columns = spec.names_of(ColumnKind::Passthrough);

        let raw_numeric: Vec<Vec<Option<f64>>> = self
            .numeric_columns
            .iter()
            .map(|name| column_of(frame, name, FieldValue::as_number))
            .collect();
        let mut imputer = Imputer::new(self.config.numeric_impute_strategy);
        imputer.fit(&raw_numeric)?;

        let imputed: Vec<Vec<f64>> = raw_numeric
            .iter()
            .enumerate()
            .map(|(i, col)| col.iter().map(|v| imputer.impute(i, *v)).collect::<Result<Vec<_>>>())
            .collect::<Result<_>>()?;
        let mut scaler = Scaler::new(self.config.scaler_type);
        scaler.fit(&imputed)?;

        let categorical: Vec<Vec<Option<String>>> = self
            .categorical_columns
            .iter()
            .map(|name| column_of(frame, name, |v| v.category_key().map(|k| k.into_owned())))
            .collect();
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&categorical)?;

        self.imputer = imputer;
        self.scaler = scaler;
        self.encoder = encoder;
        self.is_fitted = true;
        self.fit_time = Some(start.elapsed().as_secs_f64());

        debug!(
            rows = frame.n_rows(),
            numeric = self.numeric_columns.len(),
            categorical = self.categorical_columns.len(),
            passthrough = self.passthrough_columns.len(),
            outputs = self.n_features_out(),
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Transform a frame into the dense model matrix
    pub fn transform(&self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }

        let positions = frame.column_positions();
        let numeric_pos: Vec<Option<usize>> =
            self.numeric_columns.iter().map(|n| positions.get(n.as_str()).copied()).collect();
        let categorical_pos: Vec<Option<usize>> =
            self.categorical_columns.iter().map(|n| positions.get(n.as_str()).copied()).collect();
        let passthrough_pos: Vec<Option<usize>> =
            self.passthrough_columns.iter().map(|n| positions.get(n.as_str()).copied()).collect();

        let width = self.n_features_out();
        let mut data = vec![0.0; frame.n_rows() * width];

        for (row, out) in frame.rows().iter().zip(data.chunks_mut(width.max(1))) {
            let mut offset = 0;

            for (i, pos) in numeric_pos.iter().enumerate() {
                let value = pos.and_then(|p| row[p].as_number());
                let imputed = self.imputer.impute(i, value)?;
                out[offset] = self.scaler.scale(i, imputed)?;
                offset += 1;
            }

            for (i, pos) in categorical_pos.iter().enumerate() {
                let w = self.encoder.width(i);
                let key = pos.and_then(|p| row[p].category_key());
                self.encoder.encode_into(i, key.as_deref(), &mut out[offset..offset + w])?;
                offset += w;
            }

            for pos in &passthrough_pos {
                out[offset] = pos.and_then(|p| row[p].as_number()).unwrap_or(f64::NAN);
                offset += 1;
            }
        }

        Ok(Array2::from_shape_vec((frame.n_rows(), width), data)?)
    }

    pub fn fit_transform(&mut self, frame: &FeatureFrame, spec: &FeatureSpec) -> Result<Array2<f64>> {
        self.fit(frame, spec)?;
        self.transform(frame)
    }

    /// Compare `frame`'s columns with the fitted spec
    pub fn check_alignment(&self, frame: &FeatureFrame) -> Result<AlignmentReport> {
        if !self.is_fitted {
            return Err(CardioError::ModelNotFitted);
        }

        let missing = self
            .spec
            .columns()
            .iter()
            .filter(|c| frame.column_index(&c.name).is_none())
            .map(|c| c.name.clone())
            .collect();

        let unexpected = frame
            .columns()
            .iter()
            .filter(|name| !self.spec.contains(name))
            .cloned()
            .collect();

        let uncoercible = frame
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                matches!(
                    self.spec.get(name).map(|c| c.kind),
                    Some(ColumnKind::Numeric) | Some(ColumnKind::Passthrough)
                )
            })
            .filter(|(idx, _)| {
                frame.rows().iter().any(|row| matches!(row[*idx], FieldValue::Text(_)))
            })
            .map(|(_, name)| name.clone())
            .collect();

        Ok(AlignmentReport { missing, unexpected, uncoercible })
    }

    /// Name of every output column, in matrix order
    pub fn output_feature_names(&self) -> Vec<String> {
        let mut names = self.numeric_columns.clone();
        names.extend(self.encoder.feature_names(&self.categorical_columns));
        names.extend(self.passthrough_columns.iter().cloned());
        names
    }

    pub fn n_features_out(&self) -> usize {
        self.numeric_columns.len() + self.encoder.n_outputs() + self.passthrough_columns.len()
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn column_of<T: Clone>(frame: &FeatureFrame, name: &str, f: impl Fn(&FieldValue) -> Option<T>) -> Vec<Option<T>> {
    match frame.column_index(name) {
        Some(idx) => frame.rows().iter().map(|row| f(&row[idx])).collect(),
        None => vec![None; frame.n_rows()],
    }
}
