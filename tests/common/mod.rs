//! Shared fixtures for integration tests

#![allow(dead_code)]

use cardiokit::data::Dataset;
use cardiokit::export::TrainedPipeline;
use cardiokit::training::{ModelSelector, ParameterGrid, TrainingConfig};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const SEED: u64 = 42;

/// Heart-shaped data: numeric vitals plus a categorical `thal`.
/// Risk rises with age, oldpeak and exang and falls with thalach.
pub fn heart_frame(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let thal_levels = ["normal", "fixed", "reversable"];

    let mut age = Vec::with_capacity(n);
    let mut sex = Vec::with_capacity(n);
    let mut cp = Vec::with_capacity(n);
    let mut trestbps = Vec::with_capacity(n);
    let mut chol = Vec::with_capacity(n);
    let mut thalach = Vec::with_capacity(n);
    let mut exang = Vec::with_capacity(n);
    let mut oldpeak = Vec::with_capacity(n);
    let mut thal = Vec::with_capacity(n);
    let mut target = Vec::with_capacity(n);

    for _ in 0..n {
        let a: i64 = rng.gen_range(29..78);
        let hr: i64 = rng.gen_range(90..200);
        let op: f64 = (rng.gen_range(0.0..5.0f64) * 10.0).round() / 10.0;
        let ex: i64 = rng.gen_range(0..2);
        let th = thal_levels[rng.gen_range(0..3)];

        let risk = (a as f64 - 50.0) / 10.0 - (hr as f64 - 150.0) / 20.0
            + op
            + 1.5 * ex as f64
            + if th == "reversable" { 1.0 } else { 0.0 }
            + rng.gen_range(-1.0..1.0);

        age.push(a);
        sex.push(rng.gen_range(0i64..2));
        cp.push(rng.gen_range(0i64..4));
        trestbps.push(rng.gen_range(94i64..200));
        chol.push(rng.gen_range(126i64..564));
        thalach.push(hr);
        exang.push(ex);
        oldpeak.push(op);
        thal.push(th);
        target.push(i64::from(risk > 4.0));
    }

    df!(
        "age" => age,
        "sex" => sex,
        "cp" => cp,
        "trestbps" => trestbps,
        "chol" => chol,
        "thalach" => thalach,
        "exang" => exang,
        "oldpeak" => oldpeak,
        "thal" => thal,
        "target" => target
    )
    .unwrap()
}

pub fn heart_dataset(n: usize) -> Dataset {
    Dataset::from_dataframe(&heart_frame(n, SEED), "target").unwrap()
}

/// Small grid so each integration test trains in well under a second
pub fn quick_config() -> TrainingConfig {
    TrainingConfig::new()
        .with_random_state(SEED)
        .with_grid(ParameterGrid::new(vec![None, Some(4)], vec![10, 20]))
        .with_n_jobs(2)
}

pub fn trained_pipeline() -> TrainedPipeline {
    let dataset = heart_dataset(160);
    let outcome = ModelSelector::new(quick_config()).run(&dataset).unwrap();
    TrainedPipeline::from_outcome(outcome, "target", SEED)
}

pub const PATIENT: &str = r#"{
    "age": 63, "sex": 1, "cp": 3, "trestbps": 145, "chol": 233,
    "thalach": 150, "exang": 0, "oldpeak": 2.3, "thal": "fixed"
}"#;
