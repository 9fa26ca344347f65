//! Random forests and single decision trees.

use crate::surrogate::tree::{RegressionTree, TreeParams};

/// A bagged ensemble of multi-output regression trees.
///
/// With `bootstrap` disabled and a single estimator this is a plain
/// decision tree; feature subsampling at each split still applies.
#[derive(Clone, Debug)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_outputs: usize,
}

impl RandomForest {
    /// Fits `n_estimators` trees on `x → y`.
    ///
    /// Inputs must already be validated: non-empty, rectangular, finite.
    pub(crate) fn fit(
        x: &[Vec<f64>],
        y: &[Vec<f64>],
        n_estimators: usize,
        max_features: f64,
        bootstrap: bool,
        seed: u64,
    ) -> Self {
        let n_samples = x.len();
        let params = TreeParams {
            max_features,
            ..TreeParams::default()
        };
        let mut rng = fastrand::Rng::with_seed(seed);
        let all: Vec<usize> = (0..n_samples).collect();

        let trees = (0..n_estimators.max(1))
            .map(|_| {
                if bootstrap {
                    let sample: Vec<usize> =
                        (0..n_samples).map(|_| rng.usize(0..n_samples)).collect();
                    RegressionTree::fit(x, y, &sample, &params, &mut rng)
                } else {
                    RegressionTree::fit(x, y, &all, &params, &mut rng)
                }
            })
            .collect();

        Self {
            trees,
            n_outputs: y.first().map_or(0, Vec::len),
        }
    }

    /// Number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of input columns.
    #[must_use]
    pub fn n_inputs(&self) -> usize {
        self.trees.first().map_or(0, RegressionTree::n_features)
    }

    /// Number of outputs.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    /// Averages the tree predictions for one row.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_outputs];
        for tree in &self.trees {
            for (acc, v) in out.iter_mut().zip(tree.predict_row(row)) {
                *acc += v;
            }
        }
        let n = self.trees.len() as f64;
        for v in &mut out {
            *v /= n;
        }
        out
    }
}
