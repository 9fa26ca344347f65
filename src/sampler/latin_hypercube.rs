//! Latin hypercube designs.

use parking_lot::Mutex;

use crate::error::Result;
use crate::sampler::Sampler;

/// Latin hypercube sampler.
///
/// Each dimension is cut into `n_samples` equal strata; every stratum holds
/// exactly one point, jittered uniformly inside it, and the stratum order is
/// shuffled independently per dimension.
///
/// # Examples
///
/// ```
/// use wrf_fvcom_uq::sampler::{LatinHypercubeSampler, Sampler};
///
/// let points = LatinHypercubeSampler::with_seed(666).sample(10, 2).unwrap();
/// let mut strata: Vec<usize> = points.iter().map(|r| (r[0] * 10.0) as usize).collect();
/// strata.sort_unstable();
/// assert_eq!(strata, (0..10).collect::<Vec<_>>());
/// ```
pub struct LatinHypercubeSampler {
    rng: Mutex<fastrand::Rng>,
}

impl LatinHypercubeSampler {
    /// Creates a new sampler with a default random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a new sampler with a fixed seed for reproducibility.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for LatinHypercubeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for LatinHypercubeSampler {
    #[allow(clippy::cast_precision_loss)]
    fn sample(&self, n_samples: usize, n_dims: usize) -> Result<Vec<Vec<f64>>> {
        let mut rng = self.rng.lock();
        let mut points = vec![vec![0.0; n_dims]; n_samples];
        let n = n_samples as f64;

        for dim in 0..n_dims {
            let mut strata: Vec<usize> = (0..n_samples).collect();
            rng.shuffle(&mut strata);
            for (row, stratum) in points.iter_mut().zip(strata) {
                // Keep the jittered value strictly below the stratum's upper edge.
                let u = ((stratum as f64 + rng.f64()) / n).min(1.0 - f64::EPSILON);
                row[dim] = u;
            }
        }

        Ok(points)
    }
}
