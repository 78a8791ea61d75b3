//! Cross-validation and hold-out splitting

use crate::error::{CardioError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter (keeps class proportions per fold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossValidator {
    n_splits: usize,
}

impl CrossValidator {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Generate train/test splits. Index lists are ascending.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        stratified_k_fold_split(y, self.n_splits)
    }
}

/// Stratified folds without shuffling.
///
/// Per-class fold sizes come from dealing the label-sorted samples round
/// robin over the folds; within a class, samples fill the folds in their
/// original order.
fn stratified_k_fold_split(y: &Array1<f64>, n_splits: usize) -> Result<Vec<CVSplit>> {
    let n_samples = y.len();
    check_n_splits(n_samples, n_splits)?;

    let groups = class_groups(y);
    let max_count = groups.values().map(Vec::len).max().unwrap_or(0);
    if max_count < n_splits {
        return Err(CardioError::Training(format!(
            "n_splits={} cannot be greater than the number of members in each class",
            n_splits
        )));
    }
    let min_count = groups.values().map(Vec::len).min().unwrap_or(0);
    if min_count < n_splits {
        warn!(min_count, n_splits, "The least populated class has fewer members than n_splits");
    }

    // Dealing a sorted label vector round robin: position p lands in fold p % n_splits
    let mut fold_of = vec![0usize; n_samples];
    let mut offset = 0;
    for members in groups.values() {
        let mut allocation = vec![0usize; n_splits];
        for p in offset..offset + members.len() {
            allocation[p % n_splits] += 1;
        }
        offset += members.len();

        let mut member = members.iter();
        for (fold_idx, &count) in allocation.iter().enumerate() {
            for &i in member.by_ref().take(count) {
                fold_of[i] = fold_idx;
            }
        }
    }

    Ok(splits_from_assignment(&fold_of, n_splits))
}

/// Stratified hold-out split: `(train, test)` index lists, both ascending.
///
/// Each class is shuffled with a seeded RNG and contributes
/// `round(test_fraction * class_size)` samples to the test side.
pub fn stratified_train_test_split(
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(CardioError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(y.len());
    let mut test = Vec::new();

    for (_, mut members) in class_groups(y) {
        members.shuffle(&mut rng);
        let n_test = (members.len() as f64 * test_fraction).round() as usize;
        let n_test = n_test.min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    if test.is_empty() || train.is_empty() {
        return Err(CardioError::Training(format!(
            "Dataset of {} rows is too small for a {:.0}% hold-out",
            y.len(),
            test_fraction * 100.0
        )));
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Sample indices per class, classes in ascending label order
fn class_groups(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        groups.entry(val.round() as i64).or_default().push(idx);
    }
    groups
}

fn check_n_splits(n_samples: usize, n_splits: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(CardioError::InvalidParameter {
            name: "n_splits".to_string(),
            value: n_splits.to_string(),
            reason: "must be at least 2".to_string(),
        });
    }
    if n_samples < n_splits {
        return Err(CardioError::Training(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }
    Ok(())
}

fn splits_from_assignment(fold_of: &[usize], n_splits: usize) -> Vec<CVSplit> {
    (0..n_splits)
        .map(|fold_idx| {
            let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..fold_of.len()).partition(|&i| fold_of[i] == fold_idx);
            CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect()
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    pub mean_score: f64,
    /// Population standard deviation of the fold scores
    pub std_score: f64,
    pub n_folds: usize,
}

impl CVResults {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self { scores, mean_score: 0.0, std_score: 0.0, n_folds };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}
