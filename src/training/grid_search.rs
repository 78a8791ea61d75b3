//! Exhaustive hyperparameter search with stratified cross-validation

use super::config::TrainingConfig;
use super::cross_validation::{stratified_train_test_split, CVResults, CVSplit, CrossValidator};
use super::models::{ModelMetrics, TrainedModel};
use super::random_forest::{ClassWeight, MaxFeatures, RandomForest};
use crate::data::Dataset;
use crate::error::{CardioError, Result};
use crate::preprocessing::DataPreprocessor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Hyperparameters of one forest candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
}

impl ForestParams {
    /// Unfitted class-balanced forest with these parameters
    pub fn build(&self, seed: u64) -> RandomForest {
        RandomForest::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_max_features(MaxFeatures::Sqrt)
            .with_class_weight(ClassWeight::Balanced)
            .with_random_state(seed)
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_depth {
            Some(d) => write!(f, "max_depth={}, n_estimators={}", d, self.n_estimators),
            None => write!(f, "max_depth=None, n_estimators={}", self.n_estimators),
        }
    }
}

/// Cartesian grid over forest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub max_depth: Vec<Option<usize>>,
    pub n_estimators: Vec<usize>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            max_depth: vec![None, Some(6), Some(12)],
            n_estimators: vec![100, 200],
        }
    }
}

impl ParameterGrid {
    pub fn new(max_depth: Vec<Option<usize>>, n_estimators: Vec<usize>) -> Self {
        Self { max_depth, n_estimators }
    }

    /// Candidates in evaluation order: `max_depth` outer, `n_estimators` inner
    pub fn candidates(&self) -> Vec<ForestParams> {
        self.max_depth
            .iter()
            .flat_map(|&max_depth| {
                self.n_estimators
                    .iter()
                    .map(move |&n_estimators| ForestParams { n_estimators, max_depth })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.max_depth.len() * self.n_estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-validated score of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    pub cv: CVResults,
}

/// Every candidate's fold scores plus the winner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub candidates: Vec<CandidateScore>,
    pub best_index: usize,
    pub n_folds: usize,
}

impl SelectionReport {
    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }
}

/// Result of a full training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub preprocessor: DataPreprocessor,
    pub model: TrainedModel,
    pub best_params: ForestParams,
    pub report: SelectionReport,
    /// Metrics of the refit pipeline on the held-out rows
    pub test_metrics: ModelMetrics,
    pub n_train: usize,
    pub n_test: usize,
}

/// Grid search over forest parameters scored by positive-class F1
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    config: TrainingConfig,
}

impl ModelSelector {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Hold out a stratified test split, search the grid on the rest, refit
    /// the winner on the whole training partition and evaluate it.
    pub fn run(&self, dataset: &Dataset) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let (negatives, positives) = dataset.class_counts();
        if negatives == 0 || positives == 0 {
            return Err(CardioError::Schema(format!(
                "Target column '{}' must contain both classes (0 and 1), found {} negative / {} positive",
                dataset.target_name, negatives, positives
            )));
        }

        let (train_idx, test_idx) =
            stratified_train_test_split(&dataset.target, self.config.test_fraction, self.config.random_state)?;
        let train = dataset.subset(&train_idx);
        let test = dataset.subset(&test_idx);
        info!(train = train.n_samples(), test = test.n_samples(), "Stratified hold-out split");

        let report = self.search(&train)?;
        let best = report.best().clone();
        info!(params = %best.params, mean_f1 = best.cv.mean_score, "Selected best candidate");

        let (preprocessor, model) = self.fit_pipeline(&train, best.params)?;

        let x_test = preprocessor.transform(&test.features)?;
        let predictions = model.predict(&x_test)?;
        let test_metrics = ModelMetrics::compute_classification(&test.target, &predictions);

        info!(
            accuracy = test_metrics.accuracy,
            precision = test_metrics.precision,
            recall = test_metrics.recall,
            f1 = test_metrics.f1_score,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Held-out evaluation"
        );

        Ok(TrainingOutcome {
            preprocessor,
            model,
            best_params: best.params,
            report,
            test_metrics,
            n_train: train.n_samples(),
            n_test: test.n_samples(),
        })
    }

    /// Score every grid candidate with stratified k-fold CV on `train`.
    ///
    /// Each (candidate, fold) pair is an independent job on a dedicated
    /// rayon pool. Ties on the mean score go to the earlier candidate.
    pub fn search(&self, train: &Dataset) -> Result<SelectionReport> {
        let candidates = self.config.grid.candidates();
        if candidates.is_empty() {
            return Err(CardioError::Config("Parameter grid is empty".to_string()));
        }

        let splits = CrossValidator::new(self.config.cv_folds).split(&train.target)?;
        let n_folds = splits.len();

        let jobs: Vec<(usize, &CVSplit)> = (0..candidates.len())
            .flat_map(|c| splits.iter().map(move |s| (c, s)))
            .collect();

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.config.n_jobs {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| CardioError::Training(format!("Failed to build worker pool: {}", e)))?;

        info!(
            candidates = candidates.len(),
            folds = n_folds,
            workers = pool.current_num_threads(),
            "Starting grid search"
        );

        let scores: Vec<f64> = pool.install(|| {
            jobs.par_iter()
                .map(|&(c, split)| self.score_fold(train, candidates[c], split))
                .collect::<Result<Vec<_>>>()
        })?;

        let scored: Vec<CandidateScore> = candidates
            .iter()
            .zip(scores.chunks(n_folds))
            .map(|(params, fold_scores)| CandidateScore {
                params: *params,
                cv: CVResults::from_scores(fold_scores.to_vec()),
            })
            .collect();

        let mut best_index = 0;
        for (i, candidate) in scored.iter().enumerate() {
            info!(params = %candidate.params, mean_f1 = candidate.cv.mean_score, std_f1 = candidate.cv.std_score, "Candidate scored");
            if candidate.cv.mean_score > scored[best_index].cv.mean_score {
                best_index = i;
            }
        }

        Ok(SelectionReport {
            candidates: scored,
            best_index,
            n_folds,
        })
    }

    /// Fit a fresh preprocessor and forest on `train`
    pub fn fit_pipeline(&self, train: &Dataset, params: ForestParams) -> Result<(DataPreprocessor, TrainedModel)> {
        let mut preprocessor = DataPreprocessor::with_config(self.config.preprocessing.clone());
        let x = preprocessor.fit_transform(&train.features, &train.spec)?;
        let mut forest = params.build(self.config.random_state);
        forest.fit(&x, &train.target)?;
        Ok((preprocessor, TrainedModel::RandomForest(forest)))
    }

    fn score_fold(&self, train: &Dataset, params: ForestParams, split: &CVSplit) -> Result<f64> {
        let fold_train = train.subset(&split.train_indices);
        let fold_valid = train.subset(&split.test_indices);

        let (preprocessor, model) = self.fit_pipeline(&fold_train, params)?;
        let x_valid = preprocessor.transform(&fold_valid.features)?;
        let predictions = model.predict(&x_valid)?;
        let f1 = ModelMetrics::compute_classification(&fold_valid.target, &predictions).f1_score;

        debug!(params = %params, fold = split.fold_idx, f1, "Fold scored");
        Ok(f1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn synthetic_dataset(n: usize) -> Dataset {
        // Positive when a + b > 13
        let a: Vec<f64> = (0..n).map(|i| (i % 17) as f64).collect();
        let b: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64).collect();
        let cat: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "x" } else { "y" }).collect();
        let target: Vec<i64> = a.iter().zip(&b).map(|(a, b)| i64::from(a + b > 13.0)).collect();
        let df = df!("a" => a, "b" => b, "cat" => cat, "target" => target).unwrap();
        Dataset::from_dataframe(&df, "target").unwrap()
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig::new()
            .with_grid(ParameterGrid::new(vec![None, Some(2)], vec![5, 10]))
            .with_n_jobs(2)
    }

    #[test]
    fn test_default_grid_order() {
        let order: Vec<(Option<usize>, usize)> = ParameterGrid::default()
            .candidates()
            .iter()
            .map(|p| (p.max_depth, p.n_estimators))
            .collect();
        assert_eq!(
            order,
            vec![
                (None, 100),
                (None, 200),
                (Some(6), 100),
                (Some(6), 200),
                (Some(12), 100),
                (Some(12), 200),
            ]
        );
    }

    #[test]
    fn test_search_scores_every_candidate() {
        let ds = synthetic_dataset(120);
        let report = ModelSelector::new(small_config()).search(&ds).unwrap();
        assert_eq!(report.candidates.len(), 4);
        assert_eq!(report.n_folds, 5);
        for c in &report.candidates {
            assert_eq!(c.cv.scores.len(), 5);
            assert!(c.cv.scores.iter().all(|s| (0.0..=1.0).contains(s)));
        }
        let best = report.best().cv.mean_score;
        assert!(report.candidates.iter().all(|c| c.cv.mean_score <= best));
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let ds = synthetic_dataset(60);
        // Identical candidates score identically
        let config = TrainingConfig::new().with_grid(ParameterGrid::new(vec![Some(3), Some(3)], vec![5]));
        let report = ModelSelector::new(config).search(&ds).unwrap();
        assert_eq!(report.candidates[0].cv, report.candidates[1].cv);
        assert_eq!(report.best_index, 0);
    }

    #[test]
    fn test_run_is_reproducible_across_worker_counts() {
        let ds = synthetic_dataset(120);
        let a = ModelSelector::new(small_config().with_n_jobs(1)).run(&ds).unwrap();
        let b = ModelSelector::new(small_config().with_n_jobs(4)).run(&ds).unwrap();
        assert_eq!(a.best_params, b.best_params);
        assert_eq!(a.report, b.report);
        assert_eq!(a.test_metrics, b.test_metrics);
        assert_eq!(a.n_train + a.n_test, 120);
    }

    #[test]
    fn test_single_class_dataset_is_rejected() {
        let full = synthetic_dataset(120);
        let negatives: Vec<usize> = (0..full.n_samples()).filter(|&i| full.target[i] == 0.0).collect();
        let only_negatives = full.subset(&negatives);

        let err = ModelSelector::new(small_config()).run(&only_negatives).unwrap_err();
        assert!(matches!(err, CardioError::Schema(ref m) if m.contains("both classes")), "{:?}", err);
    }

    #[test]
    fn test_empty_grid_is_config_error() {
        let ds = synthetic_dataset(30);
        let config = TrainingConfig::new().with_grid(ParameterGrid::new(vec![], vec![100]));
        let err = ModelSelector::new(config).search(&ds).unwrap_err();
        assert!(matches!(err, CardioError::Config(_)));
    }

    #[test]
    fn test_params_display() {
        let p = ForestParams { n_estimators: 200, max_depth: None };
        assert_eq!(p.to_string(), "max_depth=None, n_estimators=200");
    }
}
