//! Surrogate models of the coupled model's outputs.
//!
//! A surrogate maps transformed perturbation rows (see
//! [`transform`](crate::transform)) to output modes, typically the
//! Karhunen–Loève coordinates of an output field ([`kl`]). Four regressor
//! families are available:
//!
//! | Kind | Model | Outputs |
//! |------|-------|---------|
//! | `RF` | [`RandomForest`] with bootstrap | joint or per mode |
//! | `DT` | single decision tree | joint or per mode |
//! | `GB` | [`GradientBoosting`] | per mode only |
//! | `PC` | [`PolynomialChaos`] with Lasso coefficients | per mode |
//!
//! Tree hyperparameters are chosen by an exhaustive grid search scored with
//! leave-p-out cross-validation ([`cv`]); polynomial chaos cross-validates
//! its Lasso penalty along the regularisation path.
//!
//! # Example
//!
//! ```
//! use wrf_fvcom_uq::distribution::VariableDistribution;
//! use wrf_fvcom_uq::surrogate::{Predictor, RegressorKind, SurrogateConfig, fit_surrogate};
//!
//! let x: Vec<Vec<f64>> = (0..8).map(|i| vec![f64::from(i) / 7.0]).collect();
//! let y: Vec<Vec<f64>> = x.iter().map(|r| vec![2.0 * r[0]]).collect();
//! let marginals = [VariableDistribution::Uniform { low: 0.0, high: 1.0 }];
//!
//! let config = SurrogateConfig::new(RegressorKind::DecisionTree);
//! let trained = fit_surrogate(&x, &marginals, &y, &config).unwrap();
//! let fitted = trained.predict(&x).unwrap();
//! assert!((fitted[3][0] - y[3][0]).abs() < 1e-12);
//! ```

pub mod boosting;
pub mod cv;
pub mod forest;
pub mod kl;
mod lasso;
mod model;
pub mod pce;
mod tree;

use core::fmt;
use core::str::FromStr;

pub use boosting::GradientBoosting;
pub use forest::RandomForest;
pub use kl::{KarhunenLoeve, ModeSelection};
pub use model::{Predictor, SurrogateModel};
pub use pce::PolynomialChaos;

use crate::distribution::VariableDistribution;
use crate::error::{Error, Result};
use crate::stats;
use crate::surrogate::boosting::BoostingParams;
use crate::surrogate::cv::{Split, leave_p_out_splits, weighted_rmse};
use crate::transform::TransformedMatrix;
use crate::types::DEFAULT_SEED;

/// Fractions of the input columns examined per split in the grid search.
pub const MAX_FEATURES_GRID: [f64; 4] = [0.3, 0.6, 0.8, 1.0];

/// The regressor family of a surrogate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegressorKind {
    /// Random forest (`RF`).
    RandomForest,
    /// Single decision tree (`DT`).
    DecisionTree,
    /// Gradient boosting (`GB`).
    GradientBoosting,
    /// Polynomial chaos expansion (`PC`).
    PolynomialChaos,
}

impl RegressorKind {
    /// The short code of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RandomForest => "RF",
            Self::DecisionTree => "DT",
            Self::GradientBoosting => "GB",
            Self::PolynomialChaos => "PC",
        }
    }
}

impl fmt::Display for RegressorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegressorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RF" => Ok(Self::RandomForest),
            "DT" => Ok(Self::DecisionTree),
            "GB" => Ok(Self::GradientBoosting),
            "PC" => Ok(Self::PolynomialChaos),
            _ => Err(Error::unrecognized("regressor", s)),
        }
    }
}

/// Whether output modes share one model or get one model each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FitStrategy {
    /// One multi-output model scored with the weighted RMSE.
    #[default]
    Joint,
    /// One single-output model per mode, each scored with its own RMSE.
    PerMode,
}

impl FromStr for FitStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "joint" => Ok(Self::Joint),
            "per_mode" | "per-mode" => Ok(Self::PerMode),
            _ => Err(Error::unrecognized("fit strategy", s)),
        }
    }
}

/// Hyperparameters selected for one fitted model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Hyperparameters {
    /// Tree ensembles.
    Trees {
        /// Number of trees or boosting rounds.
        n_estimators: usize,
        /// Fraction of the features examined per split.
        max_features: f64,
    },
    /// Polynomial chaos.
    Chaos {
        /// Total polynomial order.
        order: usize,
        /// Lasso penalty.
        alpha: f64,
    },
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trees {
                n_estimators,
                max_features,
            } => write!(f, "n_estimators={n_estimators}, max_features={max_features}"),
            Self::Chaos { order, alpha } => write!(f, "order={order}, alpha={alpha:.3e}"),
        }
    }
}

/// Configuration of a surrogate fit.
#[derive(Clone, Debug, PartialEq)]
pub struct SurrogateConfig {
    /// Regressor family (default: random forest).
    pub kind: RegressorKind,
    /// Joint or per-mode fitting (default: joint).
    pub strategy: FitStrategy,
    /// Rows held out per cross-validation split (default: 1).
    pub leave_out: usize,
    /// Per-mode weights of the joint score; all ones when `None`.
    pub weights: Option<Vec<f64>>,
    /// Total order of polynomial chaos expansions (default: 1).
    pub polynomial_order: usize,
    /// Keep one model per training fold and average them (default: false).
    pub fold_ensemble: bool,
    /// Early-stopping patience of gradient boosting (default: disabled).
    pub n_iter_no_change: Option<usize>,
    /// Share of rows held back for boosting early stopping (default: 0.2).
    pub validation_fraction: f64,
    /// Seed of every stochastic step (default: 666).
    pub seed: u64,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            kind: RegressorKind::RandomForest,
            strategy: FitStrategy::Joint,
            leave_out: 1,
            weights: None,
            polynomial_order: 1,
            fold_ensemble: false,
            n_iter_no_change: None,
            validation_fraction: 0.2,
            seed: DEFAULT_SEED,
        }
    }
}

impl SurrogateConfig {
    /// Default configuration for `kind`. Gradient boosting defaults to the
    /// per-mode strategy.
    #[must_use]
    pub fn new(kind: RegressorKind) -> Self {
        let strategy = if kind == RegressorKind::GradientBoosting {
            FitStrategy::PerMode
        } else {
            FitStrategy::Joint
        };
        Self {
            kind,
            strategy,
            ..Self::default()
        }
    }

    /// Sets the fit strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: FitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the number of rows held out per split.
    #[must_use]
    pub fn leave_out(mut self, p: usize) -> Self {
        self.leave_out = p;
        self
    }

    /// Sets the joint scoring weights, e.g. KL eigen-value ratios.
    #[must_use]
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Sets the polynomial chaos order.
    #[must_use]
    pub fn polynomial_order(mut self, order: usize) -> Self {
        self.polynomial_order = order;
        self
    }

    /// Enables or disables the fold ensemble.
    #[must_use]
    pub fn fold_ensemble(mut self, enabled: bool) -> Self {
        self.fold_ensemble = enabled;
        self
    }

    /// Enables boosting early stopping after `rounds` rounds without improvement.
    #[must_use]
    pub fn n_iter_no_change(mut self, rounds: usize) -> Self {
        self.n_iter_no_change = Some(rounds);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self, n_modes: usize) -> Result<()> {
        if self.kind == RegressorKind::GradientBoosting && self.strategy == FitStrategy::Joint {
            return Err(Error::InvalidConfig(
                "gradient boosting fits one mode at a time; use the per-mode strategy".to_string(),
            ));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "validation fraction must lie in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        if let Some(w) = &self.weights {
            if w.len() != n_modes {
                return Err(Error::ShapeMismatch {
                    what: "scoring weights",
                    expected: n_modes,
                    got: w.len(),
                });
            }
            if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(Error::InvalidConfig(
                    "scoring weights must be finite and non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The outcome of [`fit_surrogate`].
#[derive(Clone, Debug)]
pub struct TrainedSurrogate {
    model: SurrogateModel,
    best_params: Vec<Hyperparameters>,
    cv_scores: Vec<Vec<f64>>,
}

impl TrainedSurrogate {
    /// The fitted model.
    #[must_use]
    pub fn model(&self) -> &SurrogateModel {
        &self.model
    }

    /// Consumes the result, returning the model.
    #[must_use]
    pub fn into_model(self) -> SurrogateModel {
        self.model
    }

    /// Selected hyperparameters: one entry for a joint fit, one per mode
    /// otherwise.
    #[must_use]
    pub fn best_params(&self) -> &[Hyperparameters] {
        &self.best_params
    }

    /// Per-split cross-validation errors of the selected configuration,
    /// aligned with [`best_params`](Self::best_params).
    #[must_use]
    pub fn cv_scores(&self) -> &[Vec<f64>] {
        &self.cv_scores
    }

    /// Mean cross-validation error of each selected configuration.
    #[must_use]
    pub fn mean_cv_scores(&self) -> Vec<f64> {
        self.cv_scores.iter().map(|s| stats::mean(s)).collect()
    }
}

impl Predictor for TrainedSurrogate {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.model.predict(rows)
    }
}

/// Fits a surrogate from a transformed perturbation matrix to output modes
/// (one row per run).
///
/// # Errors
///
/// See [`fit_surrogate`].
pub fn make_surrogate_model(
    inputs: &TransformedMatrix,
    outputs: &[Vec<f64>],
    config: &SurrogateConfig,
) -> Result<TrainedSurrogate> {
    let marginals: Vec<VariableDistribution> =
        inputs.columns().iter().map(|c| c.marginal()).collect();
    fit_surrogate(inputs.values(), &marginals, outputs, config)
}

/// Fits a surrogate to `x → y`.
///
/// `marginals` gives the distribution of every input column; it shapes the
/// polynomial chaos basis and is otherwise unused.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] for empty, ragged or misaligned inputs,
/// [`Error::NonFiniteInput`] for NaN or infinite values,
/// [`Error::InvalidConfig`] for an unusable configuration (including
/// gradient boosting with the joint strategy or `leave_out >= rows`).
pub fn fit_surrogate(
    x: &[Vec<f64>],
    marginals: &[VariableDistribution],
    y: &[Vec<f64>],
    config: &SurrogateConfig,
) -> Result<TrainedSurrogate> {
    let (n_features, n_modes) = validate_inputs(x, marginals, y)?;
    config.validate(n_modes)?;
    let splits = leave_p_out_splits(x.len(), config.leave_out)?;
    trace_debug!(
        kind = config.kind.as_str(),
        n_rows = x.len(),
        n_features,
        n_modes,
        n_splits = splits.len(),
        "fitting surrogate"
    );

    let fit = Fit {
        x,
        marginals,
        splits,
        config,
    };
    match (config.kind, config.strategy) {
        (RegressorKind::PolynomialChaos, _) => fit.chaos(y),
        (_, FitStrategy::Joint) => fit.joint_trees(y, n_features, n_modes),
        (_, FitStrategy::PerMode) => fit.per_mode_trees(y, n_features, n_modes),
    }
}

fn validate_inputs(
    x: &[Vec<f64>],
    marginals: &[VariableDistribution],
    y: &[Vec<f64>],
) -> Result<(usize, usize)> {
    if x.is_empty() || y.is_empty() {
        return Err(Error::ShapeMismatch {
            what: "training rows",
            expected: 1,
            got: 0,
        });
    }
    if x.len() != y.len() {
        return Err(Error::ShapeMismatch {
            what: "output rows",
            expected: x.len(),
            got: y.len(),
        });
    }
    let n_features = x[0].len();
    let n_modes = y[0].len();
    if n_features == 0 || n_modes == 0 {
        return Err(Error::ShapeMismatch {
            what: "training columns",
            expected: 1,
            got: 0,
        });
    }
    if let Some(row) = x.iter().find(|r| r.len() != n_features) {
        return Err(Error::ShapeMismatch {
            what: "input row width",
            expected: n_features,
            got: row.len(),
        });
    }
    if let Some(row) = y.iter().find(|r| r.len() != n_modes) {
        return Err(Error::ShapeMismatch {
            what: "output row width",
            expected: n_modes,
            got: row.len(),
        });
    }
    if marginals.len() != n_features {
        return Err(Error::ShapeMismatch {
            what: "column marginals",
            expected: n_features,
            got: marginals.len(),
        });
    }
    if x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::NonFiniteInput("surrogate inputs"));
    }
    if y.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::NonFiniteInput("surrogate outputs"));
    }
    Ok((n_features, n_modes))
}

/// The hyperparameter grid of a tree-based kind.
fn tree_grid(kind: RegressorKind, n_features: usize) -> Vec<Hyperparameters> {
    let estimators: Vec<usize> = match kind {
        RegressorKind::DecisionTree => vec![1],
        _ => vec![n_features, 2 * n_features, 4 * n_features],
    };
    estimators
        .iter()
        .flat_map(|&n_estimators| {
            MAX_FEATURES_GRID.iter().map(move |&max_features| Hyperparameters::Trees {
                n_estimators,
                max_features,
            })
        })
        .collect()
}

fn take_rows(rows: &[Vec<f64>], idx: &[usize]) -> Vec<Vec<f64>> {
    idx.iter().map(|&i| rows[i].clone()).collect()
}

fn column(y: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    y.iter().map(|r| vec![r[k]]).collect()
}

/// How held-out predictions are scored.
#[derive(Clone, Copy)]
enum Scoring<'a> {
    Weighted(&'a [f64]),
    Rmse,
}

impl Scoring<'_> {
    fn score(self, truth: &[Vec<f64>], predicted: &[Vec<f64>]) -> f64 {
        match self {
            Self::Weighted(w) => weighted_rmse(truth, predicted, w),
            Self::Rmse => {
                let t: Vec<f64> = truth.iter().map(|r| r[0]).collect();
                let p: Vec<f64> = predicted.iter().map(|r| r[0]).collect();
                stats::rmse(&t, &p)
            }
        }
    }
}

struct Fit<'a> {
    x: &'a [Vec<f64>],
    marginals: &'a [VariableDistribution],
    splits: Vec<Split>,
    config: &'a SurrogateConfig,
}

impl Fit<'_> {
    /// Fits one tree-based model on the given rows.
    fn tree_model(&self, x: &[Vec<f64>], y: &[Vec<f64>], hp: Hyperparameters) -> SurrogateModel {
        let (n_estimators, max_features) = match hp {
            Hyperparameters::Trees {
                n_estimators,
                max_features,
            } => (n_estimators, max_features),
            Hyperparameters::Chaos { .. } => (1, 1.0),
        };
        let seed = self.config.seed;
        match self.config.kind {
            RegressorKind::GradientBoosting => {
                let targets: Vec<f64> = y.iter().map(|r| r[0]).collect();
                let params = BoostingParams {
                    n_estimators,
                    max_features,
                    n_iter_no_change: self.config.n_iter_no_change,
                    validation_fraction: self.config.validation_fraction,
                    ..BoostingParams::default()
                };
                SurrogateModel::Boosting(GradientBoosting::fit(x, &targets, &params, seed))
            }
            RegressorKind::DecisionTree => {
                SurrogateModel::Forest(RandomForest::fit(x, y, 1, max_features, false, seed))
            }
            _ => SurrogateModel::Forest(RandomForest::fit(
                x,
                y,
                n_estimators,
                max_features,
                true,
                seed,
            )),
        }
    }

    /// Exhaustive grid search; ties keep the earlier grid point.
    fn search(
        &self,
        y: &[Vec<f64>],
        n_features: usize,
        scoring: Scoring<'_>,
    ) -> Result<(Hyperparameters, Vec<f64>)> {
        let mut best: Option<(f64, Hyperparameters, Vec<f64>)> = None;
        for hp in tree_grid(self.config.kind, n_features) {
            let mut scores = Vec::with_capacity(self.splits.len());
            for split in &self.splits {
                let model = self.tree_model(
                    &take_rows(self.x, &split.train),
                    &take_rows(y, &split.train),
                    hp,
                );
                let predicted = model.predict(&take_rows(self.x, &split.test))?;
                scores.push(scoring.score(&take_rows(y, &split.test), &predicted));
            }
            let mean = stats::mean(&scores);
            if best.as_ref().is_none_or(|(s, _, _)| mean < *s) {
                best = Some((mean, hp, scores));
            }
        }
        let (score, hp, scores) =
            best.ok_or(Error::Internal("hyperparameter grid is never empty"))?;
        trace_info!(
            kind = self.config.kind.as_str(),
            params = %hp,
            score,
            "grid search selected hyperparameters"
        );
        Ok((hp, scores))
    }

    fn joint_trees(
        &self,
        y: &[Vec<f64>],
        n_features: usize,
        n_modes: usize,
    ) -> Result<TrainedSurrogate> {
        let ones = vec![1.0; n_modes];
        let weights = self.config.weights.as_deref().unwrap_or(&ones);
        let (hp, scores) = self.search(y, n_features, Scoring::Weighted(weights))?;

        let model = if self.config.fold_ensemble {
            SurrogateModel::Ensemble(
                self.splits
                    .iter()
                    .map(|s| {
                        self.tree_model(&take_rows(self.x, &s.train), &take_rows(y, &s.train), hp)
                    })
                    .collect(),
            )
        } else {
            self.tree_model(self.x, y, hp)
        };
        Ok(TrainedSurrogate {
            model,
            best_params: vec![hp],
            cv_scores: vec![scores],
        })
    }

    fn per_mode_trees(
        &self,
        y: &[Vec<f64>],
        n_features: usize,
        n_modes: usize,
    ) -> Result<TrainedSurrogate> {
        let columns: Vec<Vec<Vec<f64>>> = (0..n_modes).map(|k| column(y, k)).collect();
        let mut best_params = Vec::with_capacity(n_modes);
        let mut cv_scores = Vec::with_capacity(n_modes);
        for col in &columns {
            let (hp, scores) = self.search(col, n_features, Scoring::Rmse)?;
            best_params.push(hp);
            cv_scores.push(scores);
        }

        let fit_all = |rows: &[usize]| {
            SurrogateModel::PerMode(
                columns
                    .iter()
                    .zip(&best_params)
                    .map(|(col, &hp)| {
                        self.tree_model(&take_rows(self.x, rows), &take_rows(col, rows), hp)
                    })
                    .collect(),
            )
        };
        let model = if self.config.fold_ensemble {
            SurrogateModel::Ensemble(self.splits.iter().map(|s| fit_all(&s.train)).collect())
        } else {
            let all: Vec<usize> = (0..self.x.len()).collect();
            fit_all(&all)
        };
        Ok(TrainedSurrogate {
            model,
            best_params,
            cv_scores,
        })
    }

    fn chaos(&self, y: &[Vec<f64>]) -> Result<TrainedSurrogate> {
        let order = self.config.polynomial_order;
        let seed = self.config.seed;
        let n_modes = y[0].len();

        let mut full = Vec::with_capacity(n_modes);
        let mut folds: Vec<Vec<SurrogateModel>> =
            vec![Vec::with_capacity(n_modes); self.splits.len()];
        let mut best_params = Vec::with_capacity(n_modes);
        let mut cv_scores = Vec::with_capacity(n_modes);

        for k in 0..n_modes {
            let targets: Vec<f64> = y.iter().map(|r| r[k]).collect();
            let pce =
                PolynomialChaos::fit(self.x, &targets, self.marginals, order, &self.splits, seed);
            let alpha = pce.alpha();

            let mut scores = Vec::with_capacity(self.splits.len());
            for (split, fold) in self.splits.iter().zip(&mut folds) {
                let member = PolynomialChaos::fit_with_alpha(
                    self.x,
                    &targets,
                    &split.train,
                    self.marginals,
                    order,
                    alpha,
                    seed,
                );
                let truth: Vec<f64> = split.test.iter().map(|&i| targets[i]).collect();
                let predicted: Vec<f64> = split
                    .test
                    .iter()
                    .map(|&i| member.predict_row(&self.x[i]))
                    .collect();
                scores.push(stats::rmse(&truth, &predicted));
                fold.push(SurrogateModel::Chaos(member));
            }
            trace_info!(mode = k, order, alpha, "polynomial chaos penalty selected");

            best_params.push(Hyperparameters::Chaos { order, alpha });
            cv_scores.push(scores);
            full.push(SurrogateModel::Chaos(pce));
        }

        let model = if self.config.fold_ensemble {
            SurrogateModel::Ensemble(folds.into_iter().map(SurrogateModel::PerMode).collect())
        } else {
            SurrogateModel::PerMode(full)
        };
        Ok(TrainedSurrogate {
            model,
            best_params,
            cv_scores,
        })
    }
}
