//! Karhunen–Loève reduction of model output fields.
//!
//! A field sampled at `P` points over `N` runs is approximated by its mean
//! plus the leading eigenmodes of the sample covariance:
//!
//! ```text
//! y ≈ mean + Σ_k c_k √λ_k φ_k
//! ```
//!
//! Surrogates are trained on the normalised coordinates `c_k`; predictions
//! are mapped back with [`KarhunenLoeve::inverse`].

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How many eigenmodes to keep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModeSelection {
    /// A fixed number of leading modes.
    Count(usize),
    /// The fewest leading modes whose eigenvalues reach this fraction of the
    /// total variance.
    VarianceFraction(f64),
}

/// A fitted Karhunen–Loève basis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KarhunenLoeve {
    mean: Vec<f64>,
    eigenvalues: Vec<f64>,
    modes: Vec<Vec<f64>>,
    total_variance: f64,
}

impl KarhunenLoeve {
    /// Fits the basis to `samples` (runs × points).
    ///
    /// The covariance is normalised by the number of runs. When there are
    /// fewer runs than points the eigen-problem is solved on the run-by-run
    /// Gram matrix instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for empty or ragged samples,
    /// [`Error::NonFiniteInput`] for NaN or infinite values,
    /// [`Error::InvalidConfig`] for an unusable mode selection and
    /// [`Error::DegenerateVariance`] when the field does not vary.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(samples: &[Vec<f64>], selection: ModeSelection) -> Result<Self> {
        let n = samples.len();
        let p = samples.first().map_or(0, Vec::len);
        if n < 2 || p == 0 {
            return Err(Error::ShapeMismatch {
                what: "KL samples (need at least two runs)",
                expected: 2,
                got: n,
            });
        }
        if let Some(row) = samples.iter().find(|r| r.len() != p) {
            return Err(Error::ShapeMismatch {
                what: "KL sample width",
                expected: p,
                got: row.len(),
            });
        }
        if samples.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::NonFiniteInput("KL samples"));
        }

        let nf = n as f64;
        let mean: Vec<f64> = (0..p)
            .map(|j| samples.iter().map(|r| r[j]).sum::<f64>() / nf)
            .collect();
        let centered = DMatrix::from_fn(n, p, |i, j| samples[i][j] - mean[j]);

        let (values, vectors) = if n < p {
            let gram = &centered * centered.transpose() / nf;
            let eig = SymmetricEigen::new(gram);
            let mut pairs = sorted_pairs(&eig);
            // Map run-space eigenvectors to point space: φ = Yᵀu / √(Nλ).
            for (lambda, vec) in &mut pairs {
                if *lambda > 0.0 {
                    let u = nalgebra::DVector::from_column_slice(vec);
                    let phi = centered.transpose() * u / (nf * *lambda).sqrt();
                    *vec = phi.iter().copied().collect();
                } else {
                    *vec = vec![0.0; p];
                }
            }
            pairs.into_iter().unzip::<_, _, Vec<f64>, Vec<Vec<f64>>>()
        } else {
            let cov = centered.transpose() * &centered / nf;
            let eig = SymmetricEigen::new(cov);
            sorted_pairs(&eig).into_iter().unzip()
        };

        let total_variance: f64 = values.iter().map(|v| v.max(0.0)).sum();
        if !(total_variance.is_finite() && total_variance > 0.0) {
            return Err(Error::DegenerateVariance(total_variance));
        }

        let floor = values.first().map_or(0.0, |&top| top * 1e-12);
        let positive = values.iter().take_while(|&&v| v > floor).count();
        let keep = match selection {
            ModeSelection::Count(k) if k > 0 => k.min(positive),
            ModeSelection::VarianceFraction(f) if f > 0.0 && f <= 1.0 => {
                let mut acc = 0.0;
                let mut k = 0;
                for &v in values.iter().take(positive) {
                    acc += v;
                    k += 1;
                    if acc >= f * total_variance * (1.0 - 1e-12) {
                        break;
                    }
                }
                k
            }
            other => {
                return Err(Error::InvalidConfig(format!(
                    "invalid KL mode selection {other:?}"
                )));
            }
        };

        trace_debug!(n_runs = n, n_points = p, n_modes = keep, "KL basis fitted");
        Ok(Self {
            mean,
            eigenvalues: values.into_iter().take(keep).collect(),
            modes: vectors.into_iter().take(keep).collect(),
            total_variance,
        })
    }

    /// Builds a basis from known parts, e.g. one computed elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the modes do not match the mean
    /// length or the number of eigenvalues, and [`Error::InvalidConfig`] for
    /// an eigenvalue that is not finite and positive.
    pub fn from_parts(
        mean: Vec<f64>,
        eigenvalues: Vec<f64>,
        modes: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if let Some(&bad) = eigenvalues.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(Error::InvalidConfig(format!(
                "KL eigenvalues must be finite and positive, got {bad}"
            )));
        }
        if modes.len() != eigenvalues.len() {
            return Err(Error::ShapeMismatch {
                what: "KL modes",
                expected: eigenvalues.len(),
                got: modes.len(),
            });
        }
        if let Some(m) = modes.iter().find(|m| m.len() != mean.len()) {
            return Err(Error::ShapeMismatch {
                what: "KL mode length",
                expected: mean.len(),
                got: m.len(),
            });
        }
        let total_variance = eigenvalues.iter().sum();
        Ok(Self {
            mean,
            eigenvalues,
            modes,
            total_variance,
        })
    }

    /// Number of retained modes.
    #[must_use]
    pub fn n_modes(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Retained eigenvalues, descending.
    #[must_use]
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Retained eigenmodes, one per eigenvalue.
    #[must_use]
    pub fn modes(&self) -> &[Vec<f64>] {
        &self.modes
    }

    /// The mean field.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Fraction of the total variance carried by each retained mode. Usable
    /// as the scoring weights of a joint surrogate fit.
    #[must_use]
    pub fn eigen_ratios(&self) -> Vec<f64> {
        self.eigenvalues
            .iter()
            .map(|v| v / self.total_variance)
            .collect()
    }

    /// Projects fields onto the normalised mode coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for a field of the wrong length.
    pub fn project(&self, samples: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        samples
            .iter()
            .map(|row| {
                if row.len() != self.mean.len() {
                    return Err(Error::ShapeMismatch {
                        what: "KL field length",
                        expected: self.mean.len(),
                        got: row.len(),
                    });
                }
                Ok(self
                    .modes
                    .iter()
                    .zip(&self.eigenvalues)
                    .map(|(phi, &lambda)| {
                        let dot: f64 = row
                            .iter()
                            .zip(&self.mean)
                            .zip(phi)
                            .map(|((y, m), f)| (y - m) * f)
                            .sum();
                        dot / lambda.sqrt()
                    })
                    .collect())
            })
            .collect()
    }

    /// Maps normalised coordinates back to fields:
    /// `y = mean + Σ_k c_k √λ_k φ_k`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when a coordinate row does not have
    /// one value per mode.
    pub fn inverse(&self, coordinates: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        coordinates
            .iter()
            .map(|c| {
                if c.len() != self.n_modes() {
                    return Err(Error::ShapeMismatch {
                        what: "KL coordinates",
                        expected: self.n_modes(),
                        got: c.len(),
                    });
                }
                let mut field = self.mean.clone();
                for ((ck, &lambda), phi) in c.iter().zip(&self.eigenvalues).zip(&self.modes) {
                    let scale = ck * lambda.sqrt();
                    for (y, f) in field.iter_mut().zip(phi) {
                        *y += scale * f;
                    }
                }
                Ok(field)
            })
            .collect()
    }
}

/// Eigenpairs sorted by descending eigenvalue.
fn sorted_pairs(eig: &SymmetricEigen<f64, nalgebra::Dyn>) -> Vec<(f64, Vec<f64>)> {
    let mut pairs: Vec<(f64, Vec<f64>)> = eig
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(k, &v)| (v, eig.eigenvectors.column(k).iter().copied().collect()))
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<Vec<f64>> {
        // Two independent patterns over five points.
        (0..12)
            .map(|i| {
                let a = f64::from(i % 4) - 1.5;
                let b = f64::from(i % 3) - 1.0;
                vec![1.0 + a, 1.0 - a, 2.0 + b, 2.0 + b, 0.5]
            })
            .collect()
    }

    #[test]
    fn full_basis_reconstructs_samples() {
        let samples = fields();
        let kl = KarhunenLoeve::fit(&samples, ModeSelection::VarianceFraction(1.0)).unwrap();
        assert_eq!(kl.n_modes(), 2);
        let coords = kl.project(&samples).unwrap();
        let back = kl.inverse(&coords).unwrap();
        for (a, b) in samples.iter().zip(&back) {
            for (x, y) in a.iter().zip(b) {
                assert!((x - y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn eigen_ratios_sum_to_one_with_all_modes() {
        let kl = KarhunenLoeve::fit(&fields(), ModeSelection::Count(5)).unwrap();
        let sum: f64 = kl.eigen_ratios().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(kl.eigenvalues().windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn snapshot_method_matches_for_wide_fields() {
        let samples: Vec<Vec<f64>> = (0..3)
            .map(|i| (0..8).map(|j| f64::from(i * j) + f64::from(j)).collect())
            .collect();
        let kl = KarhunenLoeve::fit(&samples, ModeSelection::Count(1)).unwrap();
        let coords = kl.project(&samples).unwrap();
        let back = kl.inverse(&coords).unwrap();
        for (a, b) in samples.iter().zip(&back) {
            for (x, y) in a.iter().zip(b) {
                assert!((x - y).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn constant_fields_are_degenerate() {
        let samples = vec![vec![1.0, 2.0]; 4];
        assert!(matches!(
            KarhunenLoeve::fit(&samples, ModeSelection::Count(1)),
            Err(Error::DegenerateVariance(_))
        ));
    }

    #[test]
    fn from_parts_rejects_non_positive_eigenvalues() {
        let modes = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                KarhunenLoeve::from_parts(vec![0.0, 0.0], vec![2.0, bad], modes.clone()),
                Err(Error::InvalidConfig(_))
            ));
        }
        let kl = KarhunenLoeve::from_parts(vec![0.0, 0.0], vec![4.0, 1.0], modes).unwrap();
        let coords = kl.project(&[vec![2.0, 3.0]]).unwrap();
        assert!(coords[0].iter().all(|c| c.is_finite()));
    }
}
