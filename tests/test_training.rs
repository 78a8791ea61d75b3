//! Integration test: CSV → model selection → artifact → reload

mod common;

use cardiokit::data::{DatasetLoader, LoaderConfig};
use cardiokit::export::TrainedPipeline;
use cardiokit::inference::{InferenceConfig, PredictionService, RequestRecord};
use cardiokit::training::ModelSelector;
use cardiokit::CardioError;
use polars::prelude::*;
use std::fs::File;
use std::sync::Arc;

fn write_csv(path: &std::path::Path, n: usize) {
    let mut df = common::heart_frame(n, common::SEED);
    let mut file = File::create(path).unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(&mut df).unwrap();
}

#[test]
fn test_csv_to_artifact_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("heart.csv");
    let artifact = dir.path().join("models").join("best_pipeline.bin");
    write_csv(&csv, 150);

    let dataset = DatasetLoader::new(LoaderConfig::new()).load(&csv).unwrap();
    assert_eq!(dataset.n_samples(), 150);
    assert_eq!(dataset.features.n_columns(), 9);

    let outcome = ModelSelector::new(common::quick_config()).run(&dataset).unwrap();
    assert_eq!(outcome.n_train + outcome.n_test, 150);
    assert_eq!(outcome.n_test, 30);
    assert_eq!(outcome.report.candidates.len(), 4);
    assert_eq!(outcome.report.n_folds, 5);

    let pipeline = TrainedPipeline::from_outcome(outcome, "target", common::SEED);
    pipeline.save(&artifact).unwrap();
    let restored = TrainedPipeline::load(&artifact).unwrap();

    assert_eq!(
        pipeline.predict(&dataset.features).unwrap(),
        restored.predict(&dataset.features).unwrap()
    );
    assert_eq!(
        pipeline.predict_proba(&dataset.features).unwrap(),
        restored.predict_proba(&dataset.features).unwrap()
    );
    assert_eq!(pipeline.metadata(), restored.metadata());
    assert_eq!(pipeline.params(), restored.params());
}

#[test]
fn test_same_seed_reproduces_selection() {
    let dataset = common::heart_dataset(140);
    let first = ModelSelector::new(common::quick_config()).run(&dataset).unwrap();
    let second = ModelSelector::new(common::quick_config().with_n_jobs(1)).run(&dataset).unwrap();

    assert_eq!(first.report, second.report);
    assert_eq!(first.best_params, second.best_params);
    assert_eq!(first.test_metrics, second.test_metrics);

    let x = first.preprocessor.transform(&dataset.features).unwrap();
    assert_eq!(
        first.model.predict_proba(&x).unwrap(),
        second.model.predict_proba(&x).unwrap()
    );
}

#[test]
fn test_selected_model_beats_chance() {
    let dataset = common::heart_dataset(200);
    let outcome = ModelSelector::new(common::quick_config()).run(&dataset).unwrap();

    let best = outcome.report.best();
    assert!(best.cv.scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(outcome
        .report
        .candidates
        .iter()
        .all(|c| c.cv.mean_score <= best.cv.mean_score));
    assert!(outcome.test_metrics.accuracy > 0.6, "accuracy {}", outcome.test_metrics.accuracy);
}

#[test]
fn test_metadata_records_fitted_feature_names() {
    let pipeline = common::trained_pipeline();
    let meta = pipeline.metadata();
    assert_eq!(
        meta.input_features,
        vec!["age", "sex", "cp", "trestbps", "chol", "thalach", "exang", "oldpeak", "thal"]
    );
    // thal is one-hot encoded over its sorted vocabulary
    assert!(meta.output_features.ends_with(&[
        "thal_fixed".to_string(),
        "thal_normal".to_string(),
        "thal_reversable".to_string(),
    ]));
}

#[test]
fn test_service_prediction_matches_pipeline() {
    let pipeline = Arc::new(common::trained_pipeline());
    let config = InferenceConfig::new();
    let decimals = config.probability_decimals;
    let service = PredictionService::new(Arc::clone(&pipeline), config);

    let result = service.predict_body(common::PATIENT.as_bytes()).unwrap();

    let frame = RequestRecord::from_body(common::PATIENT.as_bytes()).unwrap().to_frame();
    let label = pipeline.predict(&frame).unwrap()[0];
    let proba = pipeline.predict_proba(&frame).unwrap().unwrap()[0];
    let scale = 10f64.powi(decimals as i32);

    assert_eq!(result.prediction, label as u8);
    assert_eq!(result.probability, Some((proba * scale).round() / scale));
}

#[tokio::test]
async fn test_cached_dataset_skips_download() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("heart.csv");
    write_csv(&csv, 40);

    let loader = DatasetLoader::new(LoaderConfig::new().with_data_url("http://127.0.0.1:9/heart.csv"));
    let dataset = loader.fetch_and_load(&csv).await.unwrap();
    assert_eq!(dataset.n_samples(), 40);
}

#[test]
fn test_missing_artifact_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = TrainedPipeline::load(dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, CardioError::ArtifactMissing { .. }));
}
