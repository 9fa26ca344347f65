//! Design-of-experiments rules that fill the unit hypercube.
//!
//! A [`Sampler`] produces `n_samples` points in `[0, 1)^n_dims`. The
//! perturbation step ([`perturb_variables`](crate::perturb::perturb_variables))
//! maps each coordinate through the matching variable's inverse CDF, so the
//! rules here know nothing about physical variables.
//!
//! | Rule | Type | Character |
//! |------|------|-----------|
//! | [`SampleRule::Random`] | [`RandomSampler`] | Independent uniform draws |
//! | [`SampleRule::Sobol`] | [`SobolSampler`] | Scrambled low-discrepancy sequence |
//! | [`SampleRule::LatinHypercube`] | [`LatinHypercubeSampler`] | One point per stratum per dimension |
//! | [`SampleRule::Korobov`] | [`KorobovSampler`] | Rank-1 lattice |

pub mod korobov;
pub mod latin_hypercube;
pub mod random;
pub mod sobol;

use core::str::FromStr;

pub use korobov::KorobovSampler;
pub use latin_hypercube::LatinHypercubeSampler;
pub use random::RandomSampler;
pub use sobol::SobolSampler;

use crate::error::{Error, Result};

/// A rule for sampling the joint distribution of the perturbed variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleRule {
    /// Pseudo-random sampling.
    Random,
    /// Scrambled Sobol sequence.
    Sobol,
    /// Latin hypercube design.
    LatinHypercube,
    /// Korobov lattice rule.
    Korobov,
}

impl SampleRule {
    /// The canonical name, used in run labels and file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Sobol => "sobol",
            Self::LatinHypercube => "latin_hypercube",
            Self::Korobov => "korobov",
        }
    }

    /// Builds the sampler implementing this rule.
    ///
    /// The Korobov lattice is deterministic and ignores `seed`.
    #[must_use]
    pub fn sampler(self, seed: u64) -> Box<dyn Sampler> {
        match self {
            Self::Random => Box::new(RandomSampler::with_seed(seed)),
            Self::Sobol => Box::new(SobolSampler::with_seed(seed)),
            Self::LatinHypercube => Box::new(LatinHypercubeSampler::with_seed(seed)),
            Self::Korobov => Box::new(KorobovSampler::new()),
        }
    }
}

impl FromStr for SampleRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "sobol" => Ok(Self::Sobol),
            "latin_hypercube" | "lhs" => Ok(Self::LatinHypercube),
            "korobov" => Ok(Self::Korobov),
            _ => Err(Error::unrecognized("sample rule", s)),
        }
    }
}

impl core::fmt::Display for SampleRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for pluggable space-filling designs.
///
/// Implementations take `&self` and keep any generator state behind a lock,
/// so a sampler can be shared. Requires `Send + Sync`.
pub trait Sampler: Send + Sync {
    /// Produces `n_samples` rows of `n_dims` coordinates in `[0, 1)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule cannot produce the requested design
    /// (for example too many dimensions for a Sobol sequence).
    fn sample(&self, n_samples: usize, n_dims: usize) -> Result<Vec<Vec<f64>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_names_round_trip() {
        for rule in [
            SampleRule::Random,
            SampleRule::Sobol,
            SampleRule::LatinHypercube,
            SampleRule::Korobov,
        ] {
            assert_eq!(rule.as_str().parse::<SampleRule>().unwrap(), rule);
        }
    }

    #[test]
    fn unknown_rule_is_rejected() {
        let err = "halton".parse::<SampleRule>().unwrap_err();
        assert!(matches!(err, Error::UnrecognizedOption { kind: "sample rule", .. }));
        assert_eq!(err.to_string(), "sample rule 'halton' not recognized");
    }

    #[test]
    fn every_rule_fills_the_unit_cube() {
        for rule in [
            SampleRule::Random,
            SampleRule::Sobol,
            SampleRule::LatinHypercube,
            SampleRule::Korobov,
        ] {
            let points = rule.sampler(3).sample(37, 4).unwrap();
            assert_eq!(points.len(), 37);
            for row in &points {
                assert_eq!(row.len(), 4);
                assert!(row.iter().all(|u| (0.0..1.0).contains(u)), "{rule}: {row:?}");
            }
        }
    }
}
