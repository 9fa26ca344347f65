//! Leave-p-out cross-validation and the scores used to rank surrogates.

use crate::error::{Error, Result};

/// Upper limit on the number of leave-p-out splits enumerated.
pub const MAX_SPLITS: usize = 100_000;

/// One cross-validation split: training rows and held-out rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    /// Rows used for fitting.
    pub train: Vec<usize>,
    /// Rows used for scoring.
    pub test: Vec<usize>,
}

/// Enumerates every split holding out `p` of `n` rows, in lexicographic
/// order of the held-out set.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `p` is zero, `p >= n`, or the number
/// of splits exceeds [`MAX_SPLITS`].
///
/// # Examples
///
/// ```
/// use wrf_fvcom_uq::surrogate::cv::leave_p_out_splits;
///
/// let splits = leave_p_out_splits(4, 2).unwrap();
/// assert_eq!(splits.len(), 6);
/// assert_eq!(splits[0].test, vec![0, 1]);
/// assert_eq!(splits[0].train, vec![2, 3]);
/// ```
pub fn leave_p_out_splits(n: usize, p: usize) -> Result<Vec<Split>> {
    if p == 0 || p >= n {
        return Err(Error::InvalidConfig(format!(
            "leave-p-out needs 0 < p < n, got p = {p} with n = {n}"
        )));
    }
    let count = binomial(n, p);
    if count.is_none_or(|c| c > MAX_SPLITS) {
        return Err(Error::InvalidConfig(format!(
            "leave-{p}-out over {n} rows exceeds {MAX_SPLITS} splits"
        )));
    }

    let mut splits = Vec::with_capacity(count.unwrap_or(0));
    let mut held: Vec<usize> = (0..p).collect();
    loop {
        let train = (0..n).filter(|i| !held.contains(i)).collect();
        splits.push(Split {
            train,
            test: held.clone(),
        });

        // Advance to the next combination.
        let Some(pos) = (0..p).rev().find(|&k| held[k] < n - p + k) else {
            break;
        };
        held[pos] += 1;
        for k in pos + 1..p {
            held[k] = held[k - 1] + 1;
        }
    }
    Ok(splits)
}

fn binomial(n: usize, k: usize) -> Option<usize> {
    let k = k.min(n - k);
    let mut acc: usize = 1;
    for i in 0..k {
        acc = acc.checked_mul(n - i)? / (i + 1);
    }
    Some(acc)
}

/// Weighted RMSE across output modes, averaged over rows:
/// `mean_rows( sqrt( Σ_k w_k (y_k − ŷ_k)² ) )`.
///
/// # Examples
///
/// ```
/// use wrf_fvcom_uq::surrogate::cv::weighted_rmse;
///
/// let truth = vec![vec![1.0, 2.0], vec![0.0, 0.0]];
/// let predicted = vec![vec![1.0, 0.0], vec![0.0, 0.0]];
/// let score = weighted_rmse(&truth, &predicted, &[1.0, 0.25]);
/// assert!((score - 0.5).abs() < 1e-12);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weighted_rmse(truth: &[Vec<f64>], predicted: &[Vec<f64>], weights: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| {
            t.iter()
                .zip(p)
                .zip(weights)
                .map(|((a, b), w)| (a - b).powi(2) * w)
                .sum::<f64>()
                .sqrt()
        })
        .sum::<f64>()
        / truth.len() as f64
}
