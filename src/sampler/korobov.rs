//! Korobov rank-1 lattice designs.
//!
//! For `n` samples the lattice uses the modulus `m = n + 1` and the
//! generating vector `g_0 = 1`, `g_j = (base · g_{j-1}) mod m`. Sample `i`
//! (0-based) in dimension `j` is the fractional part of `g_j · (i + 1) / m`.
//! The design is fully deterministic.

use crate::error::Result;
use crate::sampler::Sampler;

/// Default generator base of the lattice.
pub const DEFAULT_BASE: u64 = 17_797;

/// Korobov lattice sampler.
///
/// # Examples
///
/// ```
/// use wrf_fvcom_uq::sampler::{KorobovSampler, Sampler};
///
/// let points = KorobovSampler::new().sample(4, 1).unwrap();
/// let column: Vec<f64> = points.iter().map(|r| r[0]).collect();
/// assert_eq!(column, vec![0.2, 0.4, 0.6, 0.8]);
/// ```
#[derive(Clone, Debug)]
pub struct KorobovSampler {
    base: u64,
}

impl KorobovSampler {
    /// Creates a lattice sampler with the default base.
    #[must_use]
    pub fn new() -> Self {
        Self { base: DEFAULT_BASE }
    }

    /// Creates a lattice sampler with a custom generator base.
    #[must_use]
    pub fn with_base(base: u64) -> Self {
        Self { base }
    }

    fn generators(&self, modulus: u64, n_dims: usize) -> Vec<u64> {
        let mut generators = Vec::with_capacity(n_dims);
        let mut g = 1 % modulus;
        for _ in 0..n_dims {
            generators.push(g);
            g = (self.base % modulus) * g % modulus;
        }
        generators
    }
}

impl Default for KorobovSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for KorobovSampler {
    #[allow(clippy::cast_precision_loss)]
    fn sample(&self, n_samples: usize, n_dims: usize) -> Result<Vec<Vec<f64>>> {
        let modulus = n_samples as u64 + 1;
        let generators = self.generators(modulus, n_dims);
        let m = modulus as f64;

        Ok((1..=n_samples as u64)
            .map(|k| {
                generators
                    .iter()
                    .map(|&g| ((g * k) % modulus) as f64 / m)
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generating_vector_follows_the_base() {
        let sampler = KorobovSampler::new();
        // 17797 mod 20 = 17, 17 * 17 mod 20 = 9
        assert_eq!(sampler.generators(20, 3), vec![1, 17, 9]);
    }

    #[test]
    fn first_dimension_is_an_even_grid() {
        let points = KorobovSampler::new().sample(19, 2).unwrap();
        for (i, row) in points.iter().enumerate() {
            let expected = f64::from(u32::try_from(i + 1).unwrap()) / 20.0;
            assert!((row[0] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn deterministic() {
        let a = KorobovSampler::new().sample(11, 5).unwrap();
        let b = KorobovSampler::new().sample(11, 5).unwrap();
        assert_eq!(a, b);
    }
}
