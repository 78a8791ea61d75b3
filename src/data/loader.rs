//! Dataset acquisition: download once, cache locally, parse and validate

use crate::error::{CardioError, Result};
use super::Dataset;
use polars::io::mmap::MmapBytesReader;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// Public copy of the UCI heart-disease table
pub const DEFAULT_DATA_URL: &str =
    "https://raw.githubusercontent.com/ageron/handson-ml2/master/datasets/heart/heart.csv";

/// Where the fetched copy is cached
pub const DEFAULT_DATA_PATH: &str = "data/heart.csv";

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Remote source used when the local file is absent
    pub data_url: String,
    /// Request timeout for the download
    pub timeout_secs: u64,
    /// Name of the binary label column
    pub target_column: String,
    /// Rows scanned to infer column types
    pub infer_schema_length: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_DATA_URL.to_string(),
            timeout_secs: 15,
            target_column: "target".to_string(),
            infer_schema_length: 1000,
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }
}

/// Fetches, caches and parses the labeled dataset
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    config: LoaderConfig,
}

impl DatasetLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Make sure `path` exists locally, downloading it if needed.
    ///
    /// Returns `true` when a download happened.
    pub async fn ensure_local(&self, path: &Path) -> Result<bool> {
        if path.exists() {
            info!(path = %path.display(), "Using cached dataset");
            return Ok(false);
        }
        self.download(path).await?;
        Ok(true)
    }

    /// Download the dataset to `path`.
    ///
    /// The body must parse as a non-empty CSV table holding the target column
    /// before it is cached. Failures are
    /// reported once as [`CardioError::Download`]; there is no retry.
    pub async fn download(&self, path: &Path) -> Result<()> {
        let url = &self.config.data_url;
        let start = Instant::now();
        info!(url = %url, timeout_secs = self.config.timeout_secs, "Downloading dataset");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| CardioError::Download(format!("Failed to create HTTP client: {}", e)))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| CardioError::Download(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CardioError::Download(format!("{} returned HTTP {}", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CardioError::Download(format!("Failed to read body from {}: {}", url, e)))?;

        let df = self
            .parse_csv(Cursor::new(body.as_ref()))
            .map_err(|e| CardioError::Download(format!("Downloaded content is not a CSV table: {}", e)))?;
        if df.height() == 0 {
            return Err(CardioError::Download(format!("{} returned an empty table", url)));
        }
        if df.column(&self.config.target_column).is_err() {
            return Err(CardioError::Download(format!(
                "{} returned a table without a '{}' column",
                url, self.config.target_column
            )));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let partial = path.with_extension("part");
        fs::write(&partial, &body)?;
        fs::rename(&partial, path)?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dataset cached"
        );
        Ok(())
    }

    /// Parse and validate a local CSV file
    pub fn load(&self, path: &Path) -> Result<Dataset> {
        let file = File::open(path).map_err(|e| {
            CardioError::Data(format!("Failed to open dataset {}: {}", path.display(), e))
        })?;
        let df = self.parse_csv(file)?;
        let dataset = Dataset::from_dataframe(&df, &self.config.target_column)?;

        let (negatives, positives) = dataset.class_counts();
        info!(
            path = %path.display(),
            rows = dataset.n_samples(),
            features = dataset.spec.len(),
            positives,
            negatives,
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Ensure the local copy exists, then load it
    pub async fn fetch_and_load(&self, path: &Path) -> Result<Dataset> {
        self.ensure_local(path).await?;
        self.load(path)
    }

    fn parse_csv<R: MmapBytesReader>(&self, reader: R) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.config.infer_schema_length))
            .into_reader_with_file_handle(reader)
            .finish()?;
        Ok(df)
    }
}
