//! Error types for the cardiokit pipeline

use thiserror::Error;

/// Result type alias for cardiokit operations
pub type Result<T> = std::result::Result<T, CardioError>;

/// Main error type for training, persistence and serving
#[derive(Error, Debug)]
pub enum CardioError {
    #[error("Download error: {0}")]
    Download(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Model not found at {path}. Run `cardiokit train` first.")]
    ArtifactMissing { path: String },

    #[error("Corrupt model artifact: {0}")]
    ArtifactCorrupt(String),

    #[error("{0}")]
    RequestValidation(String),

    #[error("{0}")]
    ExplanationCompute(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<polars::error::PolarsError> for CardioError {
    fn from(err: polars::error::PolarsError) -> Self {
        CardioError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for CardioError {
    fn from(err: serde_json::Error) -> Self {
        CardioError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for CardioError {
    fn from(err: bincode::Error) -> Self {
        CardioError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for CardioError {
    fn from(err: reqwest::Error) -> Self {
        CardioError::Download(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CardioError {
    fn from(err: ndarray::ShapeError) -> Self {
        CardioError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
