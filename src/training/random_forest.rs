//! Random Forest classifier

use super::decision_tree::{argmax, DecisionTree};
use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features, rounded down
    Sqrt,
    /// Log2 of n_features, rounded down
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// Every sample weighs 1
    Uniform,
    /// `n_samples / (n_classes * count(class))`, computed on the full training labels
    Balanced,
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub random_state: Option<u64>,
    n_features: usize,
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Uniform,
            random_state: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Fit the forest.
    ///
    /// Trees are grown in parallel, each from its own seed
    /// (`random_state + tree index`), and stored in index order so the
    /// result does not depend on thread scheduling.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(CardioError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(CardioError::Training("Cannot fit a forest on zero samples".to_string()));
        }
        if self.n_estimators == 0 {
            return Err(CardioError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        // Sorted class list; label counts keyed by bit pattern for a deterministic order
        let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
        for &v in y.iter() {
            if v.is_nan() {
                return Err(CardioError::Training("Labels must not be NaN".to_string()));
            }
            counts.entry(ordered_bits(v)).or_insert((v, 0)).1 += 1;
        }
        let classes: Vec<f64> = counts.values().map(|(v, _)| *v).collect();
        let y_idx: Vec<usize> = y
            .iter()
            .map(|v| classes.iter().position(|c| c == v).unwrap_or(0))
            .collect();

        let class_weights: Vec<f64> = match self.class_weight {
            ClassWeight::Uniform => vec![1.0; classes.len()],
            ClassWeight::Balanced => counts
                .values()
                .map(|(_, count)| n_samples as f64 / (classes.len() as f64 * *count as f64))
                .collect(),
        };
        let base_weights: Vec<f64> = y_idx.iter().map(|&c| class_weights[c]).collect();

        let max_features = self.compute_max_features(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Bootstrap draws become integer multipliers on the class weights
                let weights: Vec<f64> = if self.bootstrap {
                    let mut draws = vec![0u32; n_samples];
                    for _ in 0..n_samples {
                        draws[rng.gen_range(0..n_samples)] += 1;
                    }
                    draws
                        .iter()
                        .zip(&base_weights)
                        .map(|(&d, &w)| d as f64 * w)
                        .collect()
                } else {
                    base_weights.clone()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit_weighted(x, &y_idx, &classes, &weights, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = n_features;
        self.classes = classes;

        Ok(self)
    }

    /// Mean of the trees' leaf distributions, one column per class.
    ///
    /// Summation runs in tree order so the result is bit-reproducible.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(CardioError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let n_classes = self.classes.len();
        let rows: Vec<Vec<f64>> = x
            .rows()
            .into_iter()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|row| -> Result<Vec<f64>> {
                let mut acc = vec![0.0; n_classes];
                for tree in &self.trees {
                    let dist = tree.leaf_for(row.view())?;
                    for (a, p) in acc.iter_mut().zip(dist) {
                        *a += p;
                    }
                }
                let n_trees = self.trees.len() as f64;
                acc.iter_mut().for_each(|a| *a /= n_trees);
                Ok(acc)
            })
            .collect::<Result<_>>()?;

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((x.nrows(), n_classes), flat)?)
    }

    /// Most probable class per sample; the lower class wins an exact tie
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(&row.to_vec())])
            .collect())
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

/// Total order key for a non-NaN f64
fn ordered_bits(v: f64) -> u64 {
    let bits = (v + 0.0).to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}
