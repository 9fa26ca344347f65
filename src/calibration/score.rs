//! Goodness-of-fit scores minimised by the optimizer.

use core::str::FromStr;

use crate::error::{Error, Result};
use crate::stats;

/// Which goodness-of-fit measure the optimizer minimises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScoreType {
    /// `1 − R²` between observations and predictions.
    #[default]
    R2,
    /// `var(pred − obs) / var(obs)`.
    Gamma2,
}

impl ScoreType {
    /// The lowercase name accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::R2 => "r2",
            Self::Gamma2 => "gamma2",
        }
    }

    /// Scores `predicted` against `observed`. Lower is better; a perfect
    /// match scores 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the lengths differ or are zero.
    pub fn score(self, observed: &[f64], predicted: &[f64]) -> Result<f64> {
        if observed.is_empty() || observed.len() != predicted.len() {
            return Err(Error::ShapeMismatch {
                what: "prediction length",
                expected: observed.len(),
                got: predicted.len(),
            });
        }
        Ok(match self {
            Self::R2 => 1.0 - r2(observed, predicted),
            Self::Gamma2 => {
                let residual: Vec<f64> =
                    predicted.iter().zip(observed).map(|(p, o)| p - o).collect();
                stats::variance(&residual) / stats::variance(observed)
            }
        })
    }
}

impl FromStr for ScoreType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "r2" => Ok(Self::R2),
            "gamma2" => Ok(Self::Gamma2),
            _ => Err(Error::unrecognized("score type", s)),
        }
    }
}

impl core::fmt::Display for ScoreType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coefficient of determination. Constant observations give 1 when matched
/// exactly and 0 otherwise.
#[allow(clippy::float_cmp)]
fn r2(observed: &[f64], predicted: &[f64]) -> f64 {
    let mean = stats::mean(observed);
    let ss_res: f64 = observed.iter().zip(predicted).map(|(o, p)| (o - p).powi(2)).sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    }
}
