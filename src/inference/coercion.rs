//! Request body parsing and per-field numeric coercion

use crate::data::{FeatureFrame, FieldValue};
use crate::error::{CardioError, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Message returned for bodies with nothing to predict on
pub const EMPTY_BODY: &str = "Empty request body";

/// Outcome of coercing one request value
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Value became a finite number
    Numeric(f64),
    /// Value could not be read as a number and is kept unchanged
    Kept(Value),
}

impl Coerced {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Coerced::Numeric(v) => Some(*v),
            Coerced::Kept(_) => None,
        }
    }

    /// Cell value handed to the preprocessor
    pub fn to_field_value(&self) -> FieldValue {
        match self {
            Coerced::Numeric(v) => FieldValue::Number(*v),
            Coerced::Kept(Value::Null) => FieldValue::Missing,
            Coerced::Kept(Value::String(s)) => FieldValue::Text(s.clone()),
            Coerced::Kept(other) => FieldValue::Text(other.to_string()),
        }
    }
}

/// Numbers stay numbers, numeric strings (trimmed) and booleans become numbers,
/// anything else is kept as-is. Non-finite results are kept too.
pub fn coerce_value(value: &Value) -> Coerced {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match number {
        Some(v) if v.is_finite() => Coerced::Numeric(v),
        _ => Coerced::Kept(value.clone()),
    }
}

/// One request record: field name → raw JSON value, in request order
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    fields: Map<String, Value>,
}

impl RequestRecord {
    /// Parse a raw HTTP body. Blank bodies count as empty.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(CardioError::RequestValidation(EMPTY_BODY.to_string()));
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| CardioError::RequestValidation(format!("Invalid JSON body: {}", e)))?;
        Self::from_value(value)
    }

    /// Accept an object, or an array whose first element is an object.
    ///
    /// `null`, `false`, `0`, `""`, `{}` and `[]` are empty, as is an array whose
    /// first element is empty.
    pub fn from_value(value: Value) -> Result<Self> {
        if is_empty_value(&value) {
            return Err(CardioError::RequestValidation(EMPTY_BODY.to_string()));
        }
        let record = match value {
            Value::Array(items) => match items.into_iter().next() {
                Some(first) if !is_empty_value(&first) => first,
                _ => return Err(CardioError::RequestValidation(EMPTY_BODY.to_string())),
            },
            other => other,
        };
        match record {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(CardioError::RequestValidation(format!(
                "Request body must be a JSON object mapping feature names to values, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Coerce every field, in request order
    pub fn coerced(&self) -> Vec<(String, Coerced)> {
        self.fields
            .iter()
            .map(|(name, value)| {
                let coerced = coerce_value(value);
                if let Coerced::Kept(kept) = &coerced {
                    debug!(field = %name, value = %kept, "Field kept without numeric coercion");
                }
                (name.clone(), coerced)
            })
            .collect()
    }

    /// Single-row frame holding exactly the request's fields
    pub fn to_frame(&self) -> FeatureFrame {
        FeatureFrame::single_row(
            self.coerced()
                .into_iter()
                .map(|(name, c)| (name, c.to_field_value())),
        )
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value(&json!(45)), Coerced::Numeric(45.0));
        assert_eq!(coerce_value(&json!(" 2.5 ")), Coerced::Numeric(2.5));
        assert_eq!(coerce_value(&json!(true)), Coerced::Numeric(1.0));
        assert_eq!(coerce_value(&json!("abc")), Coerced::Kept(json!("abc")));
        assert_eq!(coerce_value(&json!(null)), Coerced::Kept(Value::Null));
        assert_eq!(coerce_value(&json!("NaN")), Coerced::Kept(json!("NaN")));
        assert_eq!(coerce_value(&json!([1])), Coerced::Kept(json!([1])));
    }

    #[test]
    fn test_empty_bodies() {
        for body in ["", "  ", "null", "{}", "[]", "false", "0", "\"\"", "[{}]", "[null]"] {
            let err = RequestRecord::from_body(body.as_bytes()).unwrap_err();
            assert_eq!(err.to_string(), EMPTY_BODY, "body {:?}", body);
        }
    }

    #[test]
    fn test_array_uses_first_element() {
        let a = RequestRecord::from_body(br#"[{"age": 45}, {"age": 99}]"#).unwrap();
        let b = RequestRecord::from_body(br#"{"age": 45}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_json() {
        let err = RequestRecord::from_body(b"{not json").unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON body"));
    }

    #[test]
    fn test_non_object_record() {
        let err = RequestRecord::from_body(b"42").unwrap_err();
        assert!(matches!(err, CardioError::RequestValidation(_)));
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_frame_keeps_request_order_and_kinds() {
        let record = RequestRecord::from_body(br#"{"chol": "230", "cp": "typical", "ca": null}"#).unwrap();
        let frame = record.to_frame();
        assert_eq!(frame.columns(), &["chol", "cp", "ca"]);
        assert_eq!(frame.get(0, "chol"), Some(&FieldValue::Number(230.0)));
        assert_eq!(frame.get(0, "cp"), Some(&FieldValue::Text("typical".into())));
        assert_eq!(frame.get(0, "ca"), Some(&FieldValue::Missing));
    }
}
