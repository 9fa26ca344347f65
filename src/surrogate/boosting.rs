//! Gradient-boosted regression trees (single output, squared loss).

use crate::stats;
use crate::surrogate::tree::{RegressionTree, TreeParams};

/// Settings of one boosting fit.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BoostingParams {
    pub(crate) n_estimators: usize,
    pub(crate) max_features: f64,
    pub(crate) learning_rate: f64,
    pub(crate) max_depth: usize,
    /// Stop once the validation loss has not improved by `tol` for this many
    /// rounds. `None` disables early stopping.
    pub(crate) n_iter_no_change: Option<usize>,
    pub(crate) validation_fraction: f64,
    pub(crate) tol: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_features: 1.0,
            learning_rate: 0.1,
            max_depth: 3,
            n_iter_no_change: None,
            validation_fraction: 0.2,
            tol: 1e-4,
        }
    }
}

/// A gradient-boosting regressor.
///
/// Starts from the training mean and adds shrunken depth-limited trees
/// fitted to the current residuals.
#[derive(Clone, Debug)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_inputs: usize,
}

impl GradientBoosting {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub(crate) fn fit(x: &[Vec<f64>], y: &[f64], params: &BoostingParams, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let n = x.len();

        let (train, validation): (Vec<usize>, Vec<usize>) = match params.n_iter_no_change {
            Some(_) if n >= 2 => {
                let mut order: Vec<usize> = (0..n).collect();
                rng.shuffle(&mut order);
                let n_val =
                    ((n as f64 * params.validation_fraction).ceil() as usize).clamp(1, n - 1);
                let validation = order.split_off(n - n_val);
                (order, validation)
            }
            _ => ((0..n).collect(), Vec::new()),
        };

        let train_targets: Vec<f64> = train.iter().map(|&i| y[i]).collect();
        let init = stats::mean(&train_targets);
        let tree_params = TreeParams {
            max_depth: Some(params.max_depth),
            max_features: params.max_features,
            ..TreeParams::default()
        };

        let mut current = vec![init; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut best_loss = f64::INFINITY;
        let mut stale = 0usize;

        for _ in 0..params.n_estimators {
            let residuals: Vec<Vec<f64>> = (0..n).map(|i| vec![y[i] - current[i]]).collect();
            let tree = RegressionTree::fit(x, &residuals, &train, &tree_params, &mut rng);
            for (i, value) in current.iter_mut().enumerate() {
                *value += params.learning_rate * tree.predict_row(&x[i])[0];
            }
            trees.push(tree);

            if let Some(patience) = params.n_iter_no_change
                && !validation.is_empty()
            {
                let loss = validation
                    .iter()
                    .map(|&i| (y[i] - current[i]).powi(2))
                    .sum::<f64>()
                    / validation.len() as f64;
                if loss + params.tol < best_loss {
                    best_loss = loss;
                    stale = 0;
                } else {
                    stale += 1;
                    if stale >= patience {
                        trace_debug!(n_trees = trees.len(), "gradient boosting stopped early");
                        break;
                    }
                }
            }
        }

        Self {
            init,
            learning_rate: params.learning_rate,
            trees,
            n_inputs: x.first().map_or(0, Vec::len),
        }
    }

    /// Number of boosting rounds actually fitted.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of input columns.
    #[must_use]
    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    /// Predicts one row.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.init
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict_row(row)[0])
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![f64::from(i) / 50.0, f64::from(i % 5) / 5.0])
            .collect();
        let y = x.iter().map(|r| 3.0 * r[0] + r[1]).collect();
        (x, y)
    }

    #[test]
    fn boosting_reduces_training_error() {
        let (x, y) = data();
        let model = GradientBoosting::fit(&x, &y, &BoostingParams::default(), 666);
        let predicted: Vec<f64> = x.iter().map(|r| model.predict_row(r)).collect();
        let baseline = vec![stats::mean(&y); y.len()];
        assert!(stats::rmse(&y, &predicted) < 0.2 * stats::rmse(&y, &baseline));
    }

    #[test]
    fn zero_rounds_predicts_the_mean() {
        let (x, y) = data();
        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::default()
        };
        let model = GradientBoosting::fit(&x, &y, &params, 1);
        assert!((model.predict_row(&x[0]) - stats::mean(&y)).abs() < 1e-12);
    }

    #[test]
    fn early_stopping_caps_rounds() {
        let (x, _) = data();
        let y = vec![1.0; x.len()];
        let params = BoostingParams {
            n_estimators: 500,
            n_iter_no_change: Some(3),
            ..BoostingParams::default()
        };
        let model = GradientBoosting::fit(&x, &y, &params, 1);
        assert!(model.n_trees() <= 4, "{}", model.n_trees());
    }
}
