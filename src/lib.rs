//! cardiokit - heart-disease classification, trained and served
//!
//! The crate covers the whole lifecycle of one binary classifier:
//! - [`data`] - dataset download, CSV parsing and the row-oriented frame
//! - [`preprocessing`] - median imputation, standard scaling, one-hot encoding
//! - [`training`] - class-balanced random forest, stratified CV grid search
//! - [`export`] - the persisted pipeline artifact
//! - [`inference`] - request coercion and prediction
//! - [`explainability`] - magnitude-ranked request explanations
//! - [`server`] - HTTP API
//! - [`cli`] - `train` and `serve` commands

pub mod error;

pub mod data;
pub mod preprocessing;
pub mod training;
pub mod export;
pub mod inference;
pub mod explainability;

pub mod server;
pub mod cli;

pub use error::{CardioError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CardioError, Result};

    pub use crate::data::{Dataset, DatasetLoader, FeatureFrame, FieldValue, LoaderConfig};

    pub use crate::preprocessing::{ColumnKind, ColumnSpec, DataPreprocessor, FeatureSpec, PreprocessingConfig};

    pub use crate::training::{ForestParams, ModelMetrics, ModelSelector, ParameterGrid, RandomForest, TrainingConfig};

    pub use crate::export::{TrainedPipeline, DEFAULT_MODEL_PATH};

    pub use crate::inference::{DriftPolicy, InferenceConfig, PredictionResult, PredictionService, RequestRecord};

    pub use crate::explainability::{ExplanationResult, ExplanationService};
}
