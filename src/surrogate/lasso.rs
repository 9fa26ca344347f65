//! L1-regularised least squares without intercept, solved by randomised
//! coordinate descent along a geometric path of penalties.
//!
//! The objective is `(1 / 2n) ‖y − Xw‖² + α ‖w‖₁`.

use crate::surrogate::cv::Split;

/// Number of penalties on the regularisation path.
pub(crate) const N_ALPHAS: usize = 100;
/// Ratio of the smallest to the largest penalty.
pub(crate) const EPS: f64 = 1e-3;

const MAX_EPOCHS: usize = 1000;
const TOL: f64 = 1e-4;

/// Column-major view of a design matrix.
struct Columns {
    cols: Vec<Vec<f64>>,
    sq_norms: Vec<f64>,
}

impl Columns {
    fn new(x: &[Vec<f64>], rows: &[usize]) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let cols: Vec<Vec<f64>> = (0..n_features)
            .map(|j| rows.iter().map(|&i| x[i][j]).collect())
            .collect();
        let sq_norms = cols.iter().map(|c| c.iter().map(|v| v * v).sum()).collect();
        Self { cols, sq_norms }
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// The largest penalty worth trying: above it every coefficient is zero.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn alpha_max(x: &[Vec<f64>], y: &[f64]) -> f64 {
    let n = x.len().max(1) as f64;
    let n_features = x.first().map_or(0, Vec::len);
    (0..n_features)
        .map(|j| x.iter().zip(y).map(|(row, t)| row[j] * t).sum::<f64>().abs() / n)
        .fold(0.0, f64::max)
}

/// Penalties from `alpha_max` down to `EPS · alpha_max`, log-spaced.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn alpha_grid(alpha_max: f64) -> Vec<f64> {
    if alpha_max <= 0.0 {
        return vec![0.0];
    }
    let log_hi = alpha_max.ln();
    let log_lo = (alpha_max * EPS).ln();
    (0..N_ALPHAS)
        .map(|k| {
            let t = k as f64 / (N_ALPHAS - 1) as f64;
            (log_hi + t * (log_lo - log_hi)).exp()
        })
        .collect()
}

/// Runs coordinate descent at `alpha`, warm-started from `w`.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn descend(cols: &Columns, y: &[f64], alpha: f64, w: &mut [f64], rng: &mut fastrand::Rng) {
    let n = y.len() as f64;
    let n_features = w.len();
    if n_features == 0 {
        return;
    }
    let mut residual: Vec<f64> = y.to_vec();
    for (j, col) in cols.cols.iter().enumerate() {
        if w[j] != 0.0 {
            for (r, v) in residual.iter_mut().zip(col) {
                *r -= v * w[j];
            }
        }
    }

    let mut order: Vec<usize> = (0..n_features).collect();
    for _ in 0..MAX_EPOCHS {
        let mut max_update: f64 = 0.0;
        let mut max_weight: f64 = 0.0;
        rng.shuffle(&mut order);
        for &j in &order {
            if cols.sq_norms[j] == 0.0 {
                w[j] = 0.0;
                continue;
            }
            let col = &cols.cols[j];
            let old = w[j];
            let rho: f64 = col.iter().zip(&residual).map(|(v, r)| v * r).sum::<f64>()
                + cols.sq_norms[j] * old;
            let new = soft_threshold(rho, n * alpha) / cols.sq_norms[j];
            if new != old {
                let delta = new - old;
                for (r, v) in residual.iter_mut().zip(col) {
                    *r -= v * delta;
                }
                w[j] = new;
            }
            max_update = max_update.max((new - old).abs());
            max_weight = max_weight.max(new.abs());
        }
        if max_weight == 0.0 || max_update <= TOL * max_weight {
            break;
        }
    }
}

/// Coefficients at every penalty of `alphas`, warm-started along the path.
pub(crate) fn path(
    x: &[Vec<f64>],
    y: &[f64],
    rows: &[usize],
    alphas: &[f64],
    rng: &mut fastrand::Rng,
) -> Vec<Vec<f64>> {
    let cols = Columns::new(x, rows);
    let targets: Vec<f64> = rows.iter().map(|&i| y[i]).collect();
    let mut w = vec![0.0; cols.cols.len()];
    alphas
        .iter()
        .map(|&alpha| {
            descend(&cols, &targets, alpha, &mut w, rng);
            w.clone()
        })
        .collect()
}

/// Coefficients at a single penalty, reached along the path from the top.
pub(crate) fn fit_at(
    x: &[Vec<f64>],
    y: &[f64],
    rows: &[usize],
    alphas: &[f64],
    alpha: f64,
    rng: &mut fastrand::Rng,
) -> Vec<f64> {
    let upto: Vec<f64> = alphas.iter().copied().take_while(|&a| a >= alpha).collect();
    let upto = if upto.is_empty() { vec![alpha] } else { upto };
    path(x, y, rows, &upto, rng)
        .pop()
        .unwrap_or_else(|| vec![0.0; x.first().map_or(0, Vec::len)])
}

/// Chooses the penalty of `alphas` with the lowest mean squared error over
/// the held-out rows of `splits`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn select_alpha(
    x: &[Vec<f64>],
    y: &[f64],
    splits: &[Split],
    alphas: &[f64],
    rng: &mut fastrand::Rng,
) -> f64 {
    let mut mse = vec![0.0; alphas.len()];
    for split in splits {
        let coefs = path(x, y, &split.train, alphas, rng);
        for (k, w) in coefs.iter().enumerate() {
            let err: f64 = split
                .test
                .iter()
                .map(|&i| (y[i] - dot(&x[i], w)).powi(2))
                .sum::<f64>()
                / split.test.len().max(1) as f64;
            mse[k] += err / splits.len() as f64;
        }
    }
    let mut best = 0;
    for (k, &m) in mse.iter().enumerate() {
        if m < mse[best] {
            best = k;
        }
    }
    alphas.get(best).copied().unwrap_or(0.0)
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surrogate::cv::leave_p_out_splits;

    fn design() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let t = f64::from(i) / 10.0 - 1.0;
                vec![1.0, t, t * t - 0.35]
            })
            .collect();
        let y = x.iter().map(|r| 2.0 * r[0] + 0.5 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn alpha_grid_is_decreasing() {
        let grid = alpha_grid(2.0);
        assert_eq!(grid.len(), N_ALPHAS);
        assert!((grid[0] - 2.0).abs() < 1e-12);
        assert!((grid[N_ALPHAS - 1] - 2.0 * EPS).abs() < 1e-12);
        assert!(grid.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn largest_alpha_zeroes_everything() {
        let (x, y) = design();
        let rows: Vec<usize> = (0..x.len()).collect();
        let mut rng = fastrand::Rng::with_seed(666);
        let coefs = path(&x, &y, &rows, &[alpha_max(&x, &y)], &mut rng);
        assert!(coefs[0].iter().all(|&c| c.abs() < 1e-9));
    }

    #[test]
    fn small_alpha_recovers_coefficients() {
        let (x, y) = design();
        let rows: Vec<usize> = (0..x.len()).collect();
        let alphas = alpha_grid(alpha_max(&x, &y));
        let mut rng = fastrand::Rng::with_seed(666);
        let w = fit_at(&x, &y, &rows, &alphas, alphas[N_ALPHAS - 1], &mut rng);
        assert!((w[0] - 2.0).abs() < 0.05, "{w:?}");
        assert!((w[1] - 0.5).abs() < 0.05, "{w:?}");
        assert!(w[2].abs() < 0.05, "{w:?}");
    }

    #[test]
    fn cross_validation_prefers_weak_penalties_for_clean_data() {
        let (x, y) = design();
        let alphas = alpha_grid(alpha_max(&x, &y));
        let splits = leave_p_out_splits(x.len(), 1).unwrap();
        let mut rng = fastrand::Rng::with_seed(666);
        let alpha = select_alpha(&x, &y, &splits, &alphas, &mut rng);
        assert!(alpha < alphas[N_ALPHAS / 2]);
    }
}
