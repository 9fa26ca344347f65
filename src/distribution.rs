//! Marginal distribution families for perturbed variables.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats;

/// Half-width, in standard deviations, of the band used to bound Gaussian variables.
pub const GAUSSIAN_BAND: f64 = 3.0;

/// Smallest unit-interval value fed to an inverse CDF with unbounded support.
const PPF_EPS: f64 = 1e-12;

/// The distribution family of a perturbed variable, with its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VariableDistribution {
    /// Normal distribution.
    Gaussian {
        /// Mean.
        mean: f64,
        /// Standard deviation (positive).
        std_dev: f64,
    },
    /// Continuous uniform distribution on `[low, high]`.
    Uniform {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
    },
    /// Uniform distribution over the integers `low..=high`.
    #[serde(rename = "discreteuniform")]
    DiscreteUniform {
        /// Lower bound (inclusive).
        low: i64,
        /// Upper bound (inclusive).
        high: i64,
    },
}

/// The name-only family of a [`VariableDistribution`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistributionKind {
    /// Normal distribution.
    Gaussian,
    /// Continuous uniform distribution.
    Uniform,
    /// Discrete uniform (categorical scheme) distribution.
    DiscreteUniform,
}

impl DistributionKind {
    /// The canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Uniform => "uniform",
            Self::DiscreteUniform => "discreteuniform",
        }
    }
}

impl FromStr for DistributionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Self::Gaussian),
            "uniform" => Ok(Self::Uniform),
            "discreteuniform" => Ok(Self::DiscreteUniform),
            _ => Err(Error::unrecognized("distribution kind", s)),
        }
    }
}

impl core::fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VariableDistribution {
    /// The family of this distribution.
    #[must_use]
    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Gaussian { .. } => DistributionKind::Gaussian,
            Self::Uniform { .. } => DistributionKind::Uniform,
            Self::DiscreteUniform { .. } => DistributionKind::DiscreteUniform,
        }
    }

    /// Whether samples are integer scheme codes.
    #[must_use]
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::DiscreteUniform { .. })
    }

    /// Lower and upper bounds in physical space.
    ///
    /// Gaussian distributions report `mean ± GAUSSIAN_BAND * std_dev`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Self::Gaussian { mean, std_dev } => {
                (mean - GAUSSIAN_BAND * std_dev, mean + GAUSSIAN_BAND * std_dev)
            }
            Self::Uniform { low, high } => (low, high),
            Self::DiscreteUniform { low, high } => (low as f64, high as f64),
        }
    }

    /// Map a point of the unit interval to a value of this distribution
    /// through its inverse CDF.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn ppf(&self, u: f64) -> f64 {
        match *self {
            Self::Gaussian { mean, std_dev } => {
                mean + std_dev * stats::norm_ppf(u.clamp(PPF_EPS, 1.0 - PPF_EPS))
            }
            Self::Uniform { low, high } => low + u.clamp(0.0, 1.0) * (high - low),
            Self::DiscreteUniform { low, high } => {
                let span = high as f64 - low as f64 + 1.0;
                let raw = (low as f64 - 0.5 + u * span).round() as i64;
                raw.clamp(low, high) as f64
            }
        }
    }

    /// Check that the parameters describe a proper distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] for inverted or non-finite bounds and
    /// [`Error::InvalidStdDev`] for a non-positive standard deviation.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self, name: &str) -> Result<()> {
        match *self {
            Self::Gaussian { mean, std_dev } => {
                if !mean.is_finite() {
                    return Err(Error::NonFiniteInput("gaussian mean"));
                }
                if !(std_dev.is_finite() && std_dev > 0.0) {
                    return Err(Error::InvalidStdDev {
                        name: name.to_string(),
                        std_dev,
                    });
                }
            }
            Self::Uniform { low, high } => {
                if !(low.is_finite() && high.is_finite()) || low > high {
                    return Err(Error::InvalidBounds {
                        name: name.to_string(),
                        low,
                        high,
                    });
                }
            }
            Self::DiscreteUniform { low, high } => {
                if low > high {
                    return Err(Error::InvalidBounds {
                        name: name.to_string(),
                        low: low as f64,
                        high: high as f64,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_ppf_covers_every_code() {
        let dist = VariableDistribution::DiscreteUniform { low: 0, high: 2 };
        let codes: Vec<f64> = [0.0, 0.2, 0.34, 0.5, 0.67, 0.9, 1.0]
            .iter()
            .map(|&u| dist.ppf(u))
            .collect();
        assert_eq!(codes, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn uniform_ppf_is_linear() {
        let dist = VariableDistribution::Uniform {
            low: 1.0,
            high: 10.0,
        };
        assert!((dist.ppf(0.0) - 1.0).abs() < 1e-12);
        assert!((dist.ppf(0.5) - 5.5).abs() < 1e-12);
        assert!((dist.ppf(1.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn gaussian_ppf_is_centered_and_finite() {
        let dist = VariableDistribution::Gaussian {
            mean: 2.0,
            std_dev: 0.5,
        };
        assert!((dist.ppf(0.5) - 2.0).abs() < 1e-9);
        assert!(dist.ppf(0.0).is_finite());
        assert!(dist.ppf(1.0).is_finite());
        assert!(dist.ppf(0.9) > 2.0);
    }

    #[test]
    fn kind_parsing() {
        assert_eq!(
            "DiscreteUniform".parse::<DistributionKind>().unwrap(),
            DistributionKind::DiscreteUniform
        );
        assert!(matches!(
            "beta".parse::<DistributionKind>(),
            Err(Error::UnrecognizedOption { .. })
        ));
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        let bad = VariableDistribution::Uniform {
            low: 3.0,
            high: 1.0,
        };
        assert!(matches!(
            bad.validate("x"),
            Err(Error::InvalidBounds { .. })
        ));
        let bad = VariableDistribution::Gaussian {
            mean: 0.0,
            std_dev: 0.0,
        };
        assert!(matches!(
            bad.validate("x"),
            Err(Error::InvalidStdDev { .. })
        ));
    }

    #[test]
    fn discrete_ppf_handles_the_full_integer_range() {
        let dist = VariableDistribution::DiscreteUniform {
            low: i64::MIN,
            high: i64::MAX,
        };
        assert!(dist.validate("wide").is_ok());
        let lo = dist.ppf(0.0);
        let mid = dist.ppf(0.5);
        let hi = dist.ppf(1.0);
        assert!(lo.is_finite() && mid.is_finite() && hi.is_finite());
        assert!(lo <= mid && mid <= hi);
    }
}
