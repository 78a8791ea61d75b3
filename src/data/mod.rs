//! Tabular row model shared by training and serving
//!
//! Training rows (parsed from CSV) and request rows (parsed from JSON) are both
//! represented as a [`FeatureFrame`] of [`FieldValue`]s, so one fitted
//! preprocessor handles both sides.

pub mod loader;

pub use loader::{DatasetLoader, LoaderConfig, DEFAULT_DATA_PATH, DEFAULT_DATA_URL};

use crate::error::{CardioError, Result};
use crate::preprocessing::{ColumnKind, ColumnSpec, FeatureSpec};
use ndarray::Array1;
use polars::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Numeric content, `None` for text, missing and NaN
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Number(v) => v.is_nan(),
            FieldValue::Text(_) => false,
        }
    }

    /// Key used to look the value up in a categorical vocabulary.
    ///
    /// Integral numbers render without a fractional part, so a request that
    /// sends `3` (or `"3"`, coerced to `3.0`) matches a fitted category `"3"`.
    pub fn category_key(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            FieldValue::Number(v) if v.is_nan() => None,
            FieldValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(Cow::Owned(format!("{}", *v as i64)))
            }
            FieldValue::Number(v) => Some(Cow::Owned(v.to_string())),
            FieldValue::Missing => None,
        }
    }
}

/// Ordered, named columns with row-major values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl FeatureFrame {
    /// Create an empty frame with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a frame from rows, checking every row has one value per column
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<FieldValue>>) -> Result<Self> {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    /// Build a single-row frame from `(name, value)` pairs, keeping their order
    pub fn single_row<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (String, FieldValue)>,
    {
        let (columns, row): (Vec<String>, Vec<FieldValue>) = fields.into_iter().unzip();
        Self { columns, rows: vec![row] }
    }

    pub fn push_row(&mut self, row: Vec<FieldValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CardioError::ShapeError {
                expected: format!("{} values per row", self.columns.len()),
                actual: format!("{} values", row.len()),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Name → position lookup table
    pub fn column_positions(&self) -> HashMap<&str, usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect()
    }

    /// Value at `(row, column name)`, if the column exists
    pub fn get(&self, row: usize, column: &str) -> Option<&FieldValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Copy of the rows at `indices`, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Labeled training data
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: FeatureFrame,
    pub target: Array1<f64>,
    pub target_name: String,
    pub spec: FeatureSpec,
}

impl Dataset {
    /// Convert a parsed table into a dataset.
    ///
    /// The target column must exist, hold only 0/1 values and contain both
    /// classes. Column kinds are
    /// taken from the parsed dtypes: integers and floats are numeric, strings
    /// categorical, everything else passes through.
    pub fn from_dataframe(df: &DataFrame, target: &str) -> Result<Self> {
        let target_column = df.column(target).map_err(|_| {
            CardioError::Schema(format!("Expected '{}' column in dataset", target))
        })?;

        let target_f64 = target_column
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|e| CardioError::Schema(format!("Target column '{}' is not numeric: {}", target, e)))?;

        let mut y = Vec::with_capacity(df.height());
        for (row, value) in target_f64.f64()?.into_iter().enumerate() {
            match value {
                Some(v) if v == 0.0 || v == 1.0 => y.push(v),
                Some(v) => {
                    return Err(CardioError::Schema(format!(
                        "Target column '{}' must be binary (0/1), found {} at row {}",
                        target, v, row
                    )))
                }
                None => {
                    return Err(CardioError::Schema(format!(
                        "Target column '{}' has a missing or non-numeric value at row {}",
                        target, row
                    )))
                }
            }
        }

        let positives = y.iter().filter(|&&v| v == 1.0).count();
        if positives == 0 || positives == y.len() {
            return Err(CardioError::Schema(format!(
                "Target column '{}' must contain both classes (0 and 1)",
                target
            )));
        }

        let mut specs = Vec::new();
        let mut column_data: Vec<Vec<FieldValue>> = Vec::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == target {
                continue;
            }
            let (kind, values) = column_values(column.as_materialized_series())?;
            specs.push(ColumnSpec::new(name, kind));
            column_data.push(values);
        }

        if specs.is_empty() {
            return Err(CardioError::Schema("Dataset has no feature columns".to_string()));
        }

        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let rows: Vec<Vec<FieldValue>> = (0..df.height())
            .map(|r| column_data.iter().map(|col| col[r].clone()).collect())
            .collect();

        Ok(Self {
            features: FeatureFrame::from_rows(names, rows)?,
            target: Array1::from_vec(y),
            target_name: target.to_string(),
            spec: FeatureSpec::new(specs),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.target.len()
    }

    /// Number of rows per class, as `(negatives, positives)`
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.target.iter().filter(|&&v| v == 1.0).count();
        (self.target.len() - positives, positives)
    }

    /// Rows at `indices` as a new dataset sharing the same spec
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select_rows(indices),
            target: Array1::from_vec(indices.iter().map(|&i| self.target[i]).collect()),
            target_name: self.target_name.clone(),
            spec: self.spec.clone(),
        }
    }
}

fn column_values(series: &Series) -> Result<(ColumnKind, Vec<FieldValue>)> {
    match series.dtype() {
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
        DataType::Float32 | DataType::Float64 => {
            let casted = series.cast(&DataType::Float64)?;
            let values = casted
                .f64()?
                .into_iter()
                .map(|v| v.map_or(FieldValue::Missing, FieldValue::Number))
                .collect();
            Ok((ColumnKind::Numeric, values))
        }
        DataType::String => {
            let values = series
                .str()?
                .into_iter()
                .map(|v| v.map_or(FieldValue::Missing, |s| FieldValue::Text(s.to_string())))
                .collect();
            Ok((ColumnKind::Categorical, values))
        }
        DataType::Boolean => {
            let values = series
                .bool()?
                .into_iter()
                .map(|v| v.map_or(FieldValue::Missing, |b| FieldValue::Number(if b { 1.0 } else { 0.0 })))
                .collect();
            Ok((ColumnKind::Passthrough, values))
        }
        other => {
            let casted = series.cast(&DataType::Float64).map_err(|e| {
                CardioError::Data(format!(
                    "Column '{}' has unsupported type {:?}: {}",
                    series.name(),
                    other,
                    e
                ))
            })?;
            let values = casted
                .f64()?
                .into_iter()
                .map(|v| v.map_or(FieldValue::Missing, FieldValue::Number))
                .collect();
            Ok((ColumnKind::Passthrough, values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heart_like_df() -> DataFrame {
        df!(
            "age" => &[63i64, 37, 41, 56],
            "cp" => &["typical", "atypical", "typical", "none"],
            "oldpeak" => &[2.3, 3.5, 1.4, 0.8],
            "target" => &[1i64, 1, 0, 0]
        )
        .unwrap()
    }

    #[test]
    fn test_from_dataframe_infers_kinds_in_file_order() {
        let ds = Dataset::from_dataframe(&heart_like_df(), "target").unwrap();
        let kinds: Vec<(&str, ColumnKind)> = ds
            .spec
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("age", ColumnKind::Numeric),
                ("cp", ColumnKind::Categorical),
                ("oldpeak", ColumnKind::Numeric),
            ]
        );
        assert_eq!(ds.features.columns(), &["age", "cp", "oldpeak"]);
        assert_eq!(ds.target.to_vec(), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(ds.class_counts(), (2, 2));
    }

    #[test]
    fn test_missing_target_is_schema_error() {
        let df = df!("age" => &[1.0, 2.0]).unwrap();
        let err = Dataset::from_dataframe(&df, "target").unwrap_err();
        assert!(matches!(err, CardioError::Schema(_)));
    }

    #[test]
    fn test_non_binary_target_is_schema_error() {
        let df = df!("age" => &[1.0, 2.0], "target" => &[0i64, 2]).unwrap();
        let err = Dataset::from_dataframe(&df, "target").unwrap_err();
        assert!(matches!(err, CardioError::Schema(_)));
    }

    #[test]
    fn test_single_class_target_is_schema_error() {
        for labels in [[0i64, 0, 0], [1, 1, 1]] {
            let df = df!("age" => &[40.0, 50.0, 60.0], "target" => &labels).unwrap();
            let err = Dataset::from_dataframe(&df, "target").unwrap_err();
            assert!(matches!(err, CardioError::Schema(ref m) if m.contains("both classes")), "{:?}", err);
        }
    }

    #[test]
    fn test_empty_table_is_schema_error() {
        let df = df!("age" => Vec::<f64>::new(), "target" => Vec::<i64>::new()).unwrap();
        assert!(matches!(Dataset::from_dataframe(&df, "target"), Err(CardioError::Schema(_))));
    }

    #[test]
    fn test_boolean_column_passes_through() {
        let df = df!("flag" => &[true, false], "target" => &[0i64, 1]).unwrap();
        let ds = Dataset::from_dataframe(&df, "target").unwrap();
        assert_eq!(ds.spec.columns()[0].kind, ColumnKind::Passthrough);
        assert_eq!(ds.features.get(0, "flag"), Some(&FieldValue::Number(1.0)));
    }

    #[test]
    fn test_category_key_formats_integral_numbers() {
        assert_eq!(FieldValue::Number(3.0).category_key().as_deref(), Some("3"));
        assert_eq!(FieldValue::Number(2.5).category_key().as_deref(), Some("2.5"));
        assert_eq!(FieldValue::Text("a".into()).category_key().as_deref(), Some("a"));
        assert!(FieldValue::Missing.category_key().is_none());
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut frame = FeatureFrame::new(vec!["a".into(), "b".into()]);
        assert!(frame.push_row(vec![FieldValue::Number(1.0)]).is_err());
        assert!(frame.push_row(vec![FieldValue::Number(1.0), FieldValue::Missing]).is_ok());
    }

    #[test]
    fn test_subset_keeps_spec_and_order() {
        let ds = Dataset::from_dataframe(&heart_like_df(), "target").unwrap();
        let sub = ds.subset(&[3, 0]);
        assert_eq!(sub.n_samples(), 2);
        assert_eq!(sub.target.to_vec(), vec![0.0, 1.0]);
        assert_eq!(sub.features.get(1, "age"), Some(&FieldValue::Number(63.0)));
        assert_eq!(sub.spec, ds.spec);
    }
}
