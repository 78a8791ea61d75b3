//! Weighted Gini decision tree classifier

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Smallest impurity decrease accepted as a split
const MIN_GAIN: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf holding the weighted class distribution (sums to 1)
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node. Samples with `value <= threshold` go left, everything else
    /// (NaN included) goes right.
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (root is depth 0)
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at each split, all when `None`
    pub max_features: Option<usize>,
    n_features: usize,
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-fit inputs shared by the recursive builder
struct FitContext<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
    n_try: usize,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Fit on raw labels with unit weights, considering every feature
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup();
        let y_idx: Vec<usize> = y
            .iter()
            .map(|v| classes.iter().position(|c| c == v).unwrap_or(0))
            .collect();
        let weights = vec![1.0; y.len()];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        self.fit_weighted(x, &y_idx, &classes, &weights, &mut rng)
    }

    /// Fit on class indices into `classes`, with per-sample weights.
    ///
    /// Samples with zero weight are left out entirely, which is how bootstrap
    /// draws are expressed. Feature subsets come from `rng`.
    pub fn fit_weighted<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        classes: &[f64],
        weights: &[f64],
        rng: &mut R,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if y.len() != n_samples || weights.len() != n_samples {
            return Err(CardioError::ShapeError {
                expected: format!("{} labels and weights", n_samples),
                actual: format!("{} labels, {} weights", y.len(), weights.len()),
            });
        }
        if classes.is_empty() {
            return Err(CardioError::Training("Cannot fit a tree without classes".to_string()));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= classes.len()) {
            return Err(CardioError::Training(format!("Class index {} out of range", bad)));
        }

        let n_features = x.ncols();
        let ctx = FitContext {
            x,
            y,
            weights,
            n_classes: classes.len(),
            n_try: self.max_features.unwrap_or(n_features).min(n_features),
        };

        let indices: Vec<usize> = (0..n_samples).filter(|&i| weights[i] > 0.0).collect();
        if indices.is_empty() {
            return Err(CardioError::Training("No samples with positive weight".to_string()));
        }

        let root = self.build_node(&ctx, indices, 0, rng);

        self.n_features = n_features;
        self.classes = classes.to_vec();
        self.root = Some(root);
        Ok(self)
    }

    fn build_node<R: Rng>(
        &self,
        ctx: &FitContext<'_>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let counts = class_weights(ctx, &indices);
        let total: f64 = counts.iter().sum();
        let n_samples = indices.len();

        let is_pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;

        if should_stop {
            return leaf(counts, total, n_samples);
        }

        let parent_impurity = gini(&counts, total);
        let split = match self.find_best_split(ctx, &indices, &counts, total, parent_impurity, rng) {
            Some(split) => split,
            None => return leaf(counts, total, n_samples),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| ctx.x[[i, split.feature]] <= split.threshold);

        let left = Box::new(self.build_node(ctx, left_idx, depth + 1, rng));
        let right = Box::new(self.build_node(ctx, right_idx, depth + 1, rng));

        TreeNode::Split {
            feature_idx: split.feature,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    /// Sorted sweep over a random feature subset; first best candidate wins ties
    fn find_best_split<R: Rng>(
        &self,
        ctx: &FitContext<'_>,
        indices: &[usize],
        parent_counts: &[f64],
        parent_total: f64,
        parent_impurity: f64,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let n_features = ctx.x.ncols();
        let features = index::sample(rng, n_features, ctx.n_try);
        let mut best: Option<SplitCandidate> = None;

        for feature in features.iter() {
            let mut ordered: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (ctx.x[[i, feature]], i))
                .collect();
            // NaN sorts last so it always lands in the right partition
            ordered.sort_by(|a, b| match (a.0.is_nan(), b.0.is_nan()) {
                (false, false) => a.0.total_cmp(&b.0),
                (a_nan, b_nan) => a_nan.cmp(&b_nan),
            });

            let mut left = vec![0.0; ctx.n_classes];
            let mut left_total = 0.0;

            for pos in 0..ordered.len() - 1 {
                let (value, i) = ordered[pos];
                left[ctx.y[i]] += ctx.weights[i];
                left_total += ctx.weights[i];

                let next = ordered[pos + 1].0;
                if value.is_nan() || next.is_nan() || next <= value {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = ordered.len() - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right: Vec<f64> = parent_counts.iter().zip(&left).map(|(p, l)| p - l).collect();
                let right_total = parent_total - left_total;
                let child = (left_total * gini(&left, left_total) + right_total * gini(&right, right_total))
                    / parent_total;
                let gain = parent_impurity - child;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = (value + next) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate { feature, threshold, gain });
                }
            }
        }

        best
    }

    /// Class probabilities, one row per sample and one column per class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(CardioError::ModelNotFitted)?;
        self.check_width(x)?;
        let n_classes = self.classes.len();
        let mut out = Array2::zeros((x.nrows(), n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let dist = leaf_distribution(root, row);
            for (c, p) in dist.iter().enumerate() {
                out[[i, c]] = *p;
            }
        }
        Ok(out)
    }

    /// Most probable class label per sample
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(&row.to_vec())])
            .collect())
    }

    /// Leaf distribution reached by a single sample
    pub fn leaf_for(&self, sample: ArrayView1<'_, f64>) -> Result<&[f64]> {
        let root = self.root.as_ref().ok_or(CardioError::ModelNotFitted)?;
        Ok(leaf_distribution(root, sample))
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(CardioError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of edges on the longest root-to-leaf path
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, node_depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, count_leaves)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn class_weights(ctx: &FitContext<'_>, indices: &[usize]) -> Vec<f64> {
    let mut counts = vec![0.0; ctx.n_classes];
    for &i in indices {
        counts[ctx.y[i]] += ctx.weights[i];
    }
    counts
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn leaf(counts: Vec<f64>, total: f64, n_samples: usize) -> TreeNode {
    let distribution = if total > 0.0 {
        counts.iter().map(|c| c / total).collect()
    } else {
        vec![1.0 / counts.len() as f64; counts.len()]
    };
    TreeNode::Leaf { distribution, n_samples }
}

fn leaf_distribution<'a>(mut node: &'a TreeNode, sample: ArrayView1<'_, f64>) -> &'a [f64] {
    loop {
        match node {
            TreeNode::Leaf { distribution, .. } => return distribution,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                node = if sample[*feature_idx] <= *threshold { left } else { right };
            }
        }
    }
}

/// Index of the largest value; the lowest index wins ties
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 0,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data_is_fit_exactly() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let x = array![[0.0], [0.0], [1.0], [1.0], [1.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();
        let proba = tree.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        // x = 1 holds one negative and two positives
        assert!((proba[[4, 1]] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_shift_leaf_distribution() {
        let x = array![[0.0], [0.0], [0.0]];
        let y = [0usize, 0, 1];
        let mut tree = DecisionTree::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        tree.fit_weighted(&x, &y, &[0.0, 1.0], &[1.0, 1.0, 2.0], &mut rng).unwrap();
        let proba = tree.predict_proba(&x).unwrap();
        assert!((proba[[0, 1]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_samples_are_ignored() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = [0usize, 1, 1];
        let mut tree = DecisionTree::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        tree.fit_weighted(&x, &y, &[0.0, 1.0], &[0.0, 1.0, 1.0], &mut rng).unwrap();
        assert_eq!(tree.get_n_leaves(), 1);
        assert_eq!(tree.predict(&array![[1.0]]).unwrap()[0], 1.0);
    }

    #[test]
    fn test_nan_goes_right() {
        let x = array![[1.0], [2.0], [10.0], [11.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&array![[f64::NAN]]).unwrap()[0], 1.0);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        assert!(tree.get_depth() <= 2);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let tree = DecisionTree::new();
        assert!(matches!(tree.predict(&array![[1.0]]), Err(CardioError::ModelNotFitted)));
    }

    #[test]
    fn test_wrong_width_is_shape_error() {
        let mut tree = DecisionTree::new();
        tree.fit(&array![[1.0], [2.0]], &array![0.0, 1.0]).unwrap();
        assert!(matches!(
            tree.predict(&array![[1.0, 2.0]]),
            Err(CardioError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
    }
}
