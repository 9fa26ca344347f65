//! Random sampler implementation.

use parking_lot::Mutex;

use crate::error::Result;
use crate::sampler::Sampler;

/// A simple random sampler that draws every coordinate independently.
///
/// Serves as the baseline design and as the candidate generator of the
/// calibration search.
///
/// # Examples
///
/// ```
/// use wrf_fvcom_uq::sampler::{RandomSampler, Sampler};
///
/// // Create with a fixed seed for reproducibility
/// let sampler = RandomSampler::with_seed(42);
/// let points = sampler.sample(10, 3).unwrap();
/// assert_eq!(points.len(), 10);
/// ```
pub struct RandomSampler {
    rng: Mutex<fastrand::Rng>,
}

impl RandomSampler {
    /// Creates a new random sampler with a default random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a new random sampler with a fixed seed for reproducibility.
    ///
    /// Using the same seed will produce the same sequence of sampled values.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for RandomSampler {
    fn sample(&self, n_samples: usize, n_dims: usize) -> Result<Vec<Vec<f64>>> {
        let mut rng = self.rng.lock();
        Ok((0..n_samples)
            .map(|_| (0..n_dims).map(|_| rng.f64()).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_design() {
        let a = RandomSampler::with_seed(42).sample(20, 3).unwrap();
        let b = RandomSampler::with_seed(42).sample(20, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn successive_calls_continue_the_stream() {
        let sampler = RandomSampler::with_seed(1);
        let first = sampler.sample(5, 2).unwrap();
        let second = sampler.sample(5, 2).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn roughly_uniform_marginal() {
        let points = RandomSampler::with_seed(123).sample(4000, 1).unwrap();
        let mut values: Vec<f64> = points.into_iter().map(|r| r[0]).collect();
        values.sort_by(f64::total_cmp);
        let q1 = values[1000];
        let q2 = values[2000];
        let q3 = values[3000];
        assert!((q1 - 0.25).abs() < 0.05, "Q1 {q1} should be close to 0.25");
        assert!((q2 - 0.5).abs() < 0.05, "Q2 {q2} should be close to 0.5");
        assert!((q3 - 0.75).abs() < 0.05, "Q3 {q3} should be close to 0.75");
    }
}
