//! Gaussian-process model of the calibration score.
//!
//! Matérn 5/2 kernel with ARD lengthscales taken from the spread of the
//! training inputs, unit signal variance on standardised targets, and a
//! Cholesky solve of `K + σ²I`.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::stats;

const SQRT_5: f64 = 2.236_067_977_499_79;

/// Matérn 5/2 kernel with ARD lengthscales.
///
/// `k(x1, x2) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`
fn matern52(x1: &[f64], x2: &[f64], lengthscales: &[f64], signal_var: f64) -> f64 {
    let r_sq: f64 = x1
        .iter()
        .zip(x2)
        .zip(lengthscales)
        .map(|((a, b), l)| ((a - b) / l).powi(2))
        .sum();
    let sqrt5_r = SQRT_5 * r_sq.sqrt();
    signal_var * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

/// A fitted GP ready for predictions.
pub(crate) struct GaussianProcess {
    cholesky: nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>,
    alpha: DVector<f64>,
    x_train: Vec<Vec<f64>>,
    lengthscales: Vec<f64>,
    signal_var: f64,
    /// Best (lowest) standardised target.
    f_best: f64,
}

impl GaussianProcess {
    /// Fits the GP to `x → y`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LinearAlgebra`] when there is no data or the kernel
    /// matrix is not positive definite.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn fit(x_train: &[Vec<f64>], y_train: &[f64], noise_var: f64) -> Result<Self> {
        let n = y_train.len();
        if n == 0 || x_train.len() != n {
            return Err(Error::LinearAlgebra("GP needs matching, non-empty training data"));
        }

        let y_mean = stats::mean(y_train);
        let y_var = if n > 1 {
            y_train.iter().map(|&y| (y - y_mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            1.0
        };
        let y_std = y_var.sqrt().max(1e-10);
        let y_standardized: Vec<f64> = y_train.iter().map(|&y| (y - y_mean) / y_std).collect();
        let f_best = y_standardized.iter().copied().fold(f64::INFINITY, f64::min);

        // ARD lengthscales: per-dimension spread of the inputs, clamped.
        let d = x_train[0].len();
        let lengthscales: Vec<f64> = (0..d)
            .map(|j| {
                let column: Vec<f64> = x_train.iter().map(|x| x[j]).collect();
                stats::variance(&column).sqrt().max(0.01)
            })
            .collect();
        let signal_var = 1.0;

        let k = DMatrix::from_fn(n, n, |i, j| {
            let k = matern52(&x_train[i], &x_train[j], &lengthscales, signal_var);
            if i == j { k + noise_var } else { k }
        });
        let cholesky = nalgebra::linalg::Cholesky::new(k)
            .ok_or(Error::LinearAlgebra("GP kernel matrix is not positive definite"))?;
        let alpha = cholesky.solve(&DVector::from_column_slice(&y_standardized));

        Ok(Self {
            cholesky,
            alpha,
            x_train: x_train.to_vec(),
            lengthscales,
            signal_var,
            f_best,
        })
    }

    /// Posterior mean and standard deviation (standardised units) at `x`.
    pub(crate) fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = DVector::from_fn(self.x_train.len(), |i, _| {
            matern52(x, &self.x_train[i], &self.lengthscales, self.signal_var)
        });
        let mean = k_star.dot(&self.alpha);
        let v = self.cholesky.solve(&k_star);
        let var = (self.signal_var - k_star.dot(&v)).max(0.0);
        (mean, var.sqrt())
    }

    /// Expected improvement over the best training target at `x`.
    pub(crate) fn expected_improvement(&self, x: &[f64]) -> f64 {
        let (mean, std) = self.predict(x);
        expected_improvement(mean, std, self.f_best)
    }
}

/// `EI(x) = (f_best - mean) Φ(z) + std φ(z)` with `z = (f_best - mean) / std`.
pub(crate) fn expected_improvement(mean: f64, std: f64, f_best: f64) -> f64 {
    if std < 1e-12 {
        return (f_best - mean).max(0.0);
    }
    let z = (f_best - mean) / std;
    ((f_best - mean) * stats::norm_cdf(z) + std * stats::norm_pdf(z)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_training_points() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![f64::from(i) / 5.0]).collect();
        let y: Vec<f64> = x.iter().map(|r| (3.0 * r[0]).sin()).collect();
        let gp = GaussianProcess::fit(&x, &y, 1e-8).unwrap();
        let mean_y = stats::mean(&y);
        let std_y = (y.iter().map(|v| (v - mean_y).powi(2)).sum::<f64>() / 5.0).sqrt();
        for (row, target) in x.iter().zip(&y) {
            let (m, s) = gp.predict(row);
            assert!((m * std_y + mean_y - target).abs() < 1e-3);
            assert!(s < 1e-2);
        }
    }

    #[test]
    fn uncertainty_grows_away_from_data() {
        let x = vec![vec![0.0], vec![0.1]];
        let gp = GaussianProcess::fit(&x, &[1.0, 2.0], 1e-6).unwrap();
        let (_, near) = gp.predict(&[0.05]);
        let (_, far) = gp.predict(&[5.0]);
        assert!(far > near);
    }

    #[test]
    fn expected_improvement_behaviour() {
        assert!(expected_improvement(0.0, 1.0, 0.0) > 0.0);
        assert!((expected_improvement(-1.0, 0.0, 0.0) - 1.0).abs() < 1e-12);
        assert!(expected_improvement(1.0, 0.0, 0.0).abs() < 1e-12);
    }

    #[test]
    fn empty_data_is_an_error() {
        assert!(GaussianProcess::fit(&[], &[], 1e-6).is_err());
    }
}
