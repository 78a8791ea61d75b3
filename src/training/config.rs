//! Training configuration

use super::grid_search::ParameterGrid;
use crate::preprocessing::PreprocessingConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a model selection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for the final evaluation
    pub test_fraction: f64,

    /// Number of stratified cross-validation folds
    pub cv_folds: usize,

    /// Seed for the hold-out split and every forest
    pub random_state: u64,

    /// Worker threads for grid evaluation (None = all cores)
    pub n_jobs: Option<usize>,

    /// Hyperparameter grid
    pub grid: ParameterGrid,

    /// Preprocessing applied inside every fold and to the final refit
    pub preprocessing: PreprocessingConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 5,
            random_state: 42,
            n_jobs: None,
            grid: ParameterGrid::default(),
            preprocessing: PreprocessingConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs.max(1));
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_grid(mut self, grid: ParameterGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_preprocessing(mut self, config: PreprocessingConfig) -> Self {
        self.preprocessing = config;
        self
    }
}
