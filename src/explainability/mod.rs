//! Request explanations
//!
//! The explanation is a value-magnitude heuristic: fields are ranked by the
//! absolute value of what the client sent. It does not consult the model.

mod magnitude;

pub use magnitude::{ExplanationResult, ExplanationService, FeatureImportance};
