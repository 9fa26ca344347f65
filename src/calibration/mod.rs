//! Bayesian optimization of model parameters against observations.
//!
//! Every candidate parameter set is encoded with the surrogate's
//! [`ColumnLayout`], evaluated by the surrogate and scored against the
//! observations with a [`ScoreType`]. The search starts from a Latin
//! hypercube design and then proposes, one at a time, the candidate that
//! maximises the expected improvement of a Gaussian-process model of the
//! score.
//!
//! # Example
//!
//! ```
//! use wrf_fvcom_uq::calibration::{BayesianOptimizationConfig, run_bayesian_optimization};
//! use wrf_fvcom_uq::transform::ColumnLayout;
//! use wrf_fvcom_uq::variable::Variable;
//!
//! let variables = vec![Variable::uniform("drag", 0.0, 1.0).unwrap()];
//! let layout = ColumnLayout::declared(&variables, true).unwrap();
//! // Predicted field as a function of the scaled drag coefficient.
//! let model = |row: &[f64]| vec![row[0], 2.0 * row[0], 1.0 - row[0]];
//! let observations = [0.4, 0.8, 0.6];
//!
//! let config = BayesianOptimizationConfig::default()
//!     .n_initial_points(8)
//!     .n_calls(20);
//! let result = run_bayesian_optimization(&model, &layout, &observations, &config).unwrap();
//! assert_eq!(result.history.len(), 20);
//! assert!(result.best_score < 0.2);
//! ```

mod gp;
mod score;

use std::io::BufWriter;
use std::path::Path;

pub use self::score::ScoreType;

use self::gp::GaussianProcess;
use crate::error::{Error, Result};
use crate::sampler::{LatinHypercubeSampler, Sampler};
use crate::surrogate::{KarhunenLoeve, Predictor};
use crate::transform::{ColumnLayout, SearchSpace};
use crate::types::{DEFAULT_SEED, ParamValue};

/// What to do when the objective is NaN or infinite at a candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum NonFinitePolicy {
    /// Abort the search with [`Error::NonFiniteScore`].
    #[default]
    Error,
    /// Record this score instead and continue.
    Penalty(f64),
}

/// Configuration of [`run_bayesian_optimization`].
#[derive(Clone, Debug, PartialEq)]
pub struct BayesianOptimizationConfig {
    /// Size of the Latin hypercube initial design (default: 50).
    pub n_initial_points: usize,
    /// Total number of evaluations; `None` means `n_initial_points + 50`.
    pub n_calls: Option<usize>,
    /// Random candidates scored by expected improvement per step
    /// (default: 1000).
    pub n_candidates: usize,
    /// Noise variance added to the GP kernel diagonal (default: 1e-6).
    pub noise_variance: f64,
    /// Seed of the initial design and of the candidates (default: 666).
    pub seed: u64,
    /// Objective to minimise (default: [`ScoreType::R2`]).
    pub score_type: ScoreType,
    /// Handling of non-finite objective values.
    pub non_finite: NonFinitePolicy,
}

impl Default for BayesianOptimizationConfig {
    fn default() -> Self {
        Self {
            n_initial_points: 50,
            n_calls: None,
            n_candidates: 1000,
            noise_variance: 1e-6,
            seed: DEFAULT_SEED,
            score_type: ScoreType::R2,
            non_finite: NonFinitePolicy::Error,
        }
    }
}

impl BayesianOptimizationConfig {
    /// Sets the size of the initial design.
    #[must_use]
    pub fn n_initial_points(mut self, n: usize) -> Self {
        self.n_initial_points = n;
        self
    }

    /// Sets the total evaluation budget.
    #[must_use]
    pub fn n_calls(mut self, n: usize) -> Self {
        self.n_calls = Some(n);
        self
    }

    /// Sets the number of random candidates per GP step.
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n;
        self
    }

    /// Sets the GP noise variance.
    #[must_use]
    pub fn noise_variance(mut self, noise: f64) -> Self {
        self.noise_variance = noise;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the objective.
    #[must_use]
    pub fn score_type(mut self, score_type: ScoreType) -> Self {
        self.score_type = score_type;
        self
    }

    /// Sets the non-finite score policy.
    #[must_use]
    pub fn non_finite(mut self, policy: NonFinitePolicy) -> Self {
        self.non_finite = policy;
        self
    }

    /// The effective evaluation budget.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.n_calls.unwrap_or(self.n_initial_points + 50)
    }

    fn validate(&self) -> Result<()> {
        if self.n_initial_points == 0 {
            return Err(Error::InvalidConfig(
                "n_initial_points must be positive".to_string(),
            ));
        }
        if self.total_calls() < self.n_initial_points {
            return Err(Error::InvalidConfig(format!(
                "n_calls ({}) must be at least n_initial_points ({})",
                self.total_calls(),
                self.n_initial_points
            )));
        }
        if self.n_candidates == 0 {
            return Err(Error::InvalidConfig(
                "n_candidates must be positive".to_string(),
            ));
        }
        if !(self.noise_variance.is_finite() && self.noise_variance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "noise variance must be finite and non-negative, got {}",
                self.noise_variance
            )));
        }
        Ok(())
    }
}

/// One evaluated candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Parameter values by variable name, in catalog order.
    pub params: Vec<(String, ParamValue)>,
    /// Objective value (lower is better).
    pub score: f64,
}

impl Evaluation {
    /// Returns the value of the named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// Outcome of [`run_bayesian_optimization`].
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationResult {
    /// The lowest-scoring candidate.
    pub best: Evaluation,
    /// Its score.
    pub best_score: f64,
    /// Every evaluation in order.
    pub history: Vec<Evaluation>,
}

impl OptimizationResult {
    /// Writes the history as CSV: an `iteration` column, one column per
    /// parameter and a `score` column.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn to_csv(&self, mut writer: impl std::io::Write) -> std::io::Result<()> {
        write!(writer, "iteration")?;
        for (name, _) in &self.best.params {
            write!(writer, ",{}", csv_escape(name))?;
        }
        writeln!(writer, ",score")?;

        for (i, eval) in self.history.iter().enumerate() {
            write!(writer, "{i}")?;
            for (_, value) in &eval.params {
                write!(writer, ",{value}")?;
            }
            writeln!(writer, ",{}", eval.score)?;
        }
        Ok(())
    }

    /// Writes the history to a CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_csv(BufWriter::new(file))
    }
}

/// Escape a string for CSV output. Wraps in quotes if it contains commas,
/// quotes, or newlines.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Objective shared by the initial and GP phases.
struct Objective<'a, P: ?Sized> {
    predictor: &'a P,
    layout: &'a ColumnLayout,
    observations: &'a [f64],
    config: &'a BayesianOptimizationConfig,
}

impl<P: Predictor + ?Sized> Objective<'_, P> {
    fn evaluate(&self, encoded: Vec<f64>) -> Result<f64> {
        let prediction = self
            .predictor
            .predict(&[encoded])?
            .pop()
            .ok_or(Error::Internal("predictor returned no rows"))?;
        let score = self.config.score_type.score(self.observations, &prediction)?;
        if score.is_finite() {
            return Ok(score);
        }
        match self.config.non_finite {
            NonFinitePolicy::Error => Err(Error::NonFiniteScore(score)),
            NonFinitePolicy::Penalty(value) => {
                trace_debug!(score, penalty = value, "non-finite score replaced");
                Ok(value)
            }
        }
    }
}

/// Searches the parameter space of `layout` for the candidate whose
/// surrogate prediction best matches `observations`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for an unusable configuration,
/// [`Error::ShapeMismatch`] when predictions and observations differ in
/// length, [`Error::NonFiniteScore`] under [`NonFinitePolicy::Error`], and
/// any error of the predictor.
pub fn run_bayesian_optimization<P: Predictor + ?Sized>(
    predictor: &P,
    layout: &ColumnLayout,
    observations: &[f64],
    config: &BayesianOptimizationConfig,
) -> Result<OptimizationResult> {
    config.validate()?;
    if observations.is_empty() {
        return Err(Error::ShapeMismatch {
            what: "observations",
            expected: 1,
            got: 0,
        });
    }
    let space = SearchSpace::from_layout(layout)?;
    let objective = Objective {
        predictor,
        layout,
        observations,
        config,
    };
    let n_calls = config.total_calls();
    let mut search = SearchState::with_capacity(n_calls);

    trace_info!(
        n_initial = config.n_initial_points,
        n_calls,
        dimensions = space.len(),
        "initial design"
    );
    let design = LatinHypercubeSampler::with_seed(config.seed)
        .sample(config.n_initial_points, space.len())?;
    for unit in design {
        let params = space.point_from_unit(&unit);
        let encoded = layout.encode_params(&params)?;
        let score = objective.evaluate(encoded.clone())?;
        search.record(params, encoded, score);
    }

    if n_calls > config.n_initial_points {
        trace_info!(steps = n_calls - config.n_initial_points, "GP-guided search");
    }
    let mut rng = fastrand::Rng::with_seed(config.seed.wrapping_add(1));
    for _ in config.n_initial_points..n_calls {
        let fitted = GaussianProcess::fit(&search.encodings, &search.scores, config.noise_variance);
        let gp = match fitted {
            Ok(gp) => Some(gp),
            Err(_err) => {
                trace_debug!(error = %_err, "GP fit failed; using a random candidate");
                None
            }
        };
        let n_candidates = if gp.is_some() { config.n_candidates } else { 1 };
        let mut chosen: Option<(Vec<(String, ParamValue)>, Vec<f64>)> = None;
        let mut best_ei = f64::NEG_INFINITY;
        for _ in 0..n_candidates {
            let unit: Vec<f64> = (0..space.len()).map(|_| rng.f64()).collect();
            let params = space.point_from_unit(&unit);
            let encoded = layout.encode_params(&params)?;
            let ei = gp.as_ref().map_or(0.0, |gp| gp.expected_improvement(&encoded));
            if chosen.is_none() || ei > best_ei {
                best_ei = ei;
                chosen = Some((params, encoded));
            }
        }
        let (params, encoded) = chosen.ok_or(Error::Internal("no candidate proposed"))?;
        let score = objective.evaluate(encoded.clone())?;
        search.record(params, encoded, score);
    }

    search.finish()
}

/// Evaluations gathered so far, with the encodings the GP is fitted on.
struct SearchState {
    history: Vec<Evaluation>,
    encodings: Vec<Vec<f64>>,
    scores: Vec<f64>,
    best: Option<usize>,
}

impl SearchState {
    fn with_capacity(n: usize) -> Self {
        Self {
            history: Vec::with_capacity(n),
            encodings: Vec::with_capacity(n),
            scores: Vec::with_capacity(n),
            best: None,
        }
    }

    fn record(&mut self, params: Vec<(String, ParamValue)>, encoded: Vec<f64>, score: f64) {
        if self.best.is_none_or(|b| score < self.scores[b]) {
            trace_info!(iteration = self.history.len(), score, "new best score");
            self.best = Some(self.history.len());
        }
        self.history.push(Evaluation { params, score });
        self.encodings.push(encoded);
        self.scores.push(score);
    }

    fn finish(self) -> Result<OptimizationResult> {
        let index = self.best.ok_or(Error::Internal("no evaluations recorded"))?;
        let best = self.history[index].clone();
        Ok(OptimizationResult {
            best_score: best.score,
            best,
            history: self.history,
        })
    }
}

/// Evaluates `predictor` at the best candidate of `result`, mapping the
/// prediction back to the physical field with `kl` when given.
///
/// # Errors
///
/// Returns the errors of [`ColumnLayout::encode_params`], of the predictor
/// and of [`KarhunenLoeve::inverse`].
pub fn best_prediction<P: Predictor + ?Sized>(
    predictor: &P,
    layout: &ColumnLayout,
    result: &OptimizationResult,
    kl: Option<&KarhunenLoeve>,
) -> Result<Vec<f64>> {
    let encoded = layout.encode_params(&result.best.params)?;
    let prediction = predictor.predict(&[encoded])?;
    let mut rows = match kl {
        Some(kl) => kl.inverse(&prediction)?,
        None => prediction,
    };
    rows.pop().ok_or(Error::Internal("predictor returned no rows"))
}
