//! Inference
//!
//! Request bodies are parsed into a [`RequestRecord`], coerced field by field
//! and turned into a single-row frame that the loaded pipeline aligns by name
//! against its fitted schema.

mod coercion;
mod config;
mod engine;

pub use coercion::{coerce_value, Coerced, RequestRecord, EMPTY_BODY};
pub use config::{DriftPolicy, InferenceConfig};
pub use engine::{PredictionResult, PredictionService};
