#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Uncertainty quantification toolkit for coupled WRF–FVCOM
//! atmosphere–ocean runs: it draws perturbed physics parameters, trains
//! surrogates of the model output, ranks the parameters by Sobol
//! sensitivity, and calibrates them against observations with Gaussian
//! process Bayesian optimization.
//!
//! # Getting Started
//!
//! Perturb the built-in catalog, fit a surrogate and rank the parameters:
//!
//! ```
//! use wrf_fvcom_uq::prelude::*;
//!
//! let variables = VariableCatalog::builtin().as_slice().to_vec();
//! let matrix = perturb_variables(&variables, 24, SampleRule::Sobol, &PerturbOptions::default())
//!     .unwrap();
//! let inputs = transform_perturbation_matrix(&matrix, &TransformOptions::default()).unwrap();
//!
//! // Stand-in for the simulator: one output driven mostly by the Prandtl number.
//! let outputs: Vec<Vec<f64>> = matrix.values().iter().map(|r| vec![0.1 * r[0] + r[1]]).collect();
//!
//! let config = SurrogateConfig::new(RegressorKind::RandomForest).leave_out(1);
//! let surrogate = make_surrogate_model(&inputs, &outputs, &config).unwrap();
//!
//! let sobol = SobolConfig::default().sample_size(500);
//! let indices = compute_sensitivities(&surrogate, inputs.layout(), &sobol).unwrap();
//! assert_eq!(indices.variable_names, ["WRF PBL_SFCLAY", "FVCOM Prandtl"]);
//! ```
//!
//! # Workflow
//!
//! | Step | Entry point | Module |
//! |------|-------------|--------|
//! | Describe perturbed parameters | [`VariableCatalog`](variable::VariableCatalog) | [`variable`], [`distribution`] |
//! | Draw an ensemble design | [`perturb_variables`](perturb::perturb_variables) | [`perturb`], [`sampler`] |
//! | Encode for the surrogate | [`transform_perturbation_matrix`](transform::transform_perturbation_matrix) | [`transform`] |
//! | Reduce output fields | [`KarhunenLoeve`](surrogate::KarhunenLoeve) | [`surrogate::kl`] |
//! | Train a surrogate | [`make_surrogate_model`](surrogate::make_surrogate_model) | [`surrogate`] |
//! | Rank parameters | [`compute_sensitivities`](sensitivity::compute_sensitivities) | [`sensitivity`] |
//! | Calibrate | [`run_bayesian_optimization`](calibration::run_bayesian_optimization) | [`calibration`] |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) for sampling, grid search, Sobol and optimizer progress | on |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod calibration;
pub mod distribution;
mod error;
pub mod perturb;
pub mod sampler;
pub mod sensitivity;
mod stats;
pub mod surrogate;
pub mod transform;
mod types;
pub mod variable;

pub use error::{Error, Result};
pub use types::{DEFAULT_SEED, ParamValue};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use wrf_fvcom_uq::prelude::*;
/// ```
pub mod prelude {
    pub use crate::calibration::{
        BayesianOptimizationConfig, NonFinitePolicy, OptimizationResult, ScoreType, best_prediction,
        run_bayesian_optimization,
    };
    pub use crate::distribution::VariableDistribution;
    pub use crate::error::{Error, Result};
    pub use crate::perturb::{PerturbOptions, PerturbationMatrix, perturb_variables};
    pub use crate::sampler::{SampleRule, Sampler};
    pub use crate::sensitivity::{SensitivityIndices, SobolConfig, compute_sensitivities};
    pub use crate::surrogate::{
        FitStrategy, KarhunenLoeve, ModeSelection, Predictor, RegressorKind, SurrogateConfig,
        TrainedSurrogate, make_surrogate_model,
    };
    pub use crate::transform::{
        ColumnLayout, TransformOptions, TransformedMatrix, transform_perturbation_matrix,
    };
    pub use crate::types::{DEFAULT_SEED, ParamValue};
    pub use crate::variable::{Variable, VariableCatalog};
}
