//! Core value types shared by the catalog, sampler and optimizer.

use serde::{Deserialize, Serialize};

/// Seed used by every stochastic component unless configured otherwise.
pub const DEFAULT_SEED: u64 = 666;

/// A single parameter value in physical space.
///
/// Discrete-uniform (categorical scheme) variables carry `Int` codes,
/// continuous variables carry `Float` values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A continuous parameter value.
    Float(f64),
    /// An integer scheme code.
    Int(i64),
}

impl ParamValue {
    /// The value as `f64`, as it appears in a perturbation matrix.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Float(v) => v,
            Self::Int(v) => v as f64,
        }
    }
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}
