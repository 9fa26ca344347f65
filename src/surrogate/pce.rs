//! Polynomial chaos expansions.
//!
//! Each input column gets polynomials orthonormal under its marginal,
//! generated by a three-term recurrence:
//!
//! - uniform marginals use Legendre recurrence coefficients,
//! - Gaussian marginals use probabilists' Hermite coefficients,
//! - discrete marginals run the Stieltjes procedure on their support.
//!
//! The expansion holds all tensor products of total degree up to the
//! requested order. Coefficients are fitted by a Lasso path without
//! intercept; the penalty is picked by cross-validation.

use crate::distribution::VariableDistribution;
use crate::surrogate::cv::Split;
use crate::surrogate::lasso;

/// Recurrence coefficients of a family of orthonormal polynomials, applied
/// after the affine map `t = (x − shift) / scale`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct OrthonormalBasis {
    shift: f64,
    scale: f64,
    alphas: Vec<f64>,
    /// `betas[0]` is the total mass (1); `betas[k]` links degrees `k-1` and `k`.
    betas: Vec<f64>,
}

impl OrthonormalBasis {
    /// Builds the family for `marginal` up to `max_degree`. Discrete
    /// marginals cap the degree at their support size minus one.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn for_marginal(marginal: &VariableDistribution, max_degree: usize) -> Self {
        match *marginal {
            VariableDistribution::Uniform { low, high } => {
                let half = 0.5 * (high - low);
                Self {
                    shift: 0.5 * (low + high),
                    scale: if half > 0.0 { half } else { 1.0 },
                    alphas: vec![0.0; max_degree + 1],
                    betas: (0..=max_degree)
                        .map(|k| {
                            if k == 0 {
                                1.0
                            } else {
                                let k2 = (k * k) as f64;
                                k2 / (4.0 * k2 - 1.0)
                            }
                        })
                        .collect(),
                }
            }
            VariableDistribution::Gaussian { mean, std_dev } => Self {
                shift: mean,
                scale: std_dev,
                alphas: vec![0.0; max_degree + 1],
                betas: (0..=max_degree)
                    .map(|k| if k == 0 { 1.0 } else { k as f64 })
                    .collect(),
            },
            VariableDistribution::DiscreteUniform { low, high } => {
                let support: Vec<f64> = (low..=high).map(|v| v as f64).collect();
                Self::stieltjes(&support, max_degree.min(support.len().saturating_sub(1)))
            }
        }
    }

    /// Discrete Stieltjes procedure for equally weighted support points.
    #[allow(clippy::cast_precision_loss)]
    fn stieltjes(support: &[f64], degree: usize) -> Self {
        let weight = 1.0 / support.len().max(1) as f64;
        let mut prev = vec![0.0; support.len()];
        let mut cur = vec![1.0; support.len()];
        let mut prev_norm = 1.0;
        let mut alphas = Vec::with_capacity(degree + 1);
        let mut betas = Vec::with_capacity(degree + 1);

        for k in 0..=degree {
            let norm: f64 = cur.iter().map(|p| weight * p * p).sum();
            let alpha = support
                .iter()
                .zip(&cur)
                .map(|(x, p)| weight * x * p * p)
                .sum::<f64>()
                / norm;
            let beta = if k == 0 { 1.0 } else { norm / prev_norm };
            alphas.push(alpha);
            betas.push(beta);

            let next: Vec<f64> = support
                .iter()
                .zip(cur.iter().zip(&prev))
                .map(|(x, (c, p))| (x - alpha) * c - beta * p)
                .collect();
            prev = core::mem::replace(&mut cur, next);
            prev_norm = norm;
        }

        Self {
            shift: 0.0,
            scale: 1.0,
            alphas,
            betas,
        }
    }

    /// Highest available degree.
    pub(crate) fn max_degree(&self) -> usize {
        self.betas.len().saturating_sub(1)
    }

    /// Values of the orthonormal polynomials of degree `0..=max_degree` at `x`.
    pub(crate) fn evaluate(&self, x: f64) -> Vec<f64> {
        let t = (x - self.shift) / self.scale;
        let degree = self.max_degree();
        let mut values = Vec::with_capacity(degree + 1);
        values.push(1.0);
        let mut prev = 0.0;
        for k in 0..degree {
            let cur = values[k];
            let next = ((t - self.alphas[k]) * cur - self.betas[k].sqrt() * prev)
                / self.betas[k + 1].sqrt();
            prev = cur;
            values.push(next);
        }
        values
    }
}

/// Total-order multi-indices with per-dimension caps, graded by total
/// degree.
fn multi_indices(caps: &[usize], order: usize) -> Vec<Vec<usize>> {
    fn extend(
        caps: &[usize],
        remaining: usize,
        prefix: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if prefix.len() == caps.len() {
            out.push(prefix.clone());
            return;
        }
        let cap = caps[prefix.len()].min(remaining);
        for d in 0..=cap {
            prefix.push(d);
            extend(caps, remaining - d, prefix, out);
            prefix.pop();
        }
    }

    let mut out = Vec::new();
    extend(caps, order, &mut Vec::new(), &mut out);
    out.sort_by_key(|idx| (idx.iter().sum::<usize>(), core::cmp::Reverse(idx.clone())));
    out
}

/// The polynomial basis of an expansion: per-column families and the
/// multi-indices of the retained terms.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Expansion {
    bases: Vec<OrthonormalBasis>,
    indices: Vec<Vec<usize>>,
}

impl Expansion {
    pub(crate) fn new(marginals: &[VariableDistribution], order: usize) -> Self {
        let bases: Vec<OrthonormalBasis> = marginals
            .iter()
            .map(|m| OrthonormalBasis::for_marginal(m, order))
            .collect();
        let caps: Vec<usize> = bases.iter().map(OrthonormalBasis::max_degree).collect();
        Self {
            indices: multi_indices(&caps, order),
            bases,
        }
    }

    pub(crate) fn n_terms(&self) -> usize {
        self.indices.len()
    }

    /// Evaluates every term of the expansion at one input row.
    pub(crate) fn design_row(&self, row: &[f64]) -> Vec<f64> {
        let tables: Vec<Vec<f64>> = self
            .bases
            .iter()
            .zip(row)
            .map(|(b, &x)| b.evaluate(x))
            .collect();
        self.indices
            .iter()
            .map(|idx| {
                idx.iter()
                    .zip(&tables)
                    .map(|(&d, table)| table[d])
                    .product()
            })
            .collect()
    }

    pub(crate) fn design(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter().map(|row| self.design_row(row)).collect()
    }
}

/// A single-output polynomial chaos expansion.
#[derive(Clone, Debug)]
pub struct PolynomialChaos {
    expansion: Expansion,
    coefficients: Vec<f64>,
    order: usize,
    alpha: f64,
}

impl PolynomialChaos {
    /// Fits coefficients at the penalty chosen by cross-validating the Lasso
    /// path over `splits`.
    pub(crate) fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        marginals: &[VariableDistribution],
        order: usize,
        splits: &[Split],
        seed: u64,
    ) -> Self {
        let expansion = Expansion::new(marginals, order);
        let design = expansion.design(x);
        let alphas = lasso::alpha_grid(lasso::alpha_max(&design, y));
        let mut rng = fastrand::Rng::with_seed(seed);
        let alpha = lasso::select_alpha(&design, y, splits, &alphas, &mut rng);
        let rows: Vec<usize> = (0..x.len()).collect();
        let coefficients = lasso::fit_at(&design, y, &rows, &alphas, alpha, &mut rng);
        trace_debug!(order, alpha, n_terms = expansion.n_terms(), "polynomial chaos fitted");
        Self {
            expansion,
            coefficients,
            order,
            alpha,
        }
    }

    /// Fits coefficients on `rows` at a fixed penalty.
    pub(crate) fn fit_with_alpha(
        x: &[Vec<f64>],
        y: &[f64],
        rows: &[usize],
        marginals: &[VariableDistribution],
        order: usize,
        alpha: f64,
        seed: u64,
    ) -> Self {
        let expansion = Expansion::new(marginals, order);
        let design = expansion.design(x);
        let sub_x: Vec<Vec<f64>> = rows.iter().map(|&i| design[i].clone()).collect();
        let sub_y: Vec<f64> = rows.iter().map(|&i| y[i]).collect();
        let alphas = lasso::alpha_grid(lasso::alpha_max(&sub_x, &sub_y));
        let mut rng = fastrand::Rng::with_seed(seed);
        let coefficients = lasso::fit_at(&design, y, rows, &alphas, alpha, &mut rng);
        Self {
            expansion,
            coefficients,
            order,
            alpha,
        }
    }

    /// Total polynomial order.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// The Lasso penalty the coefficients were fitted at.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Expansion coefficients, one per term.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of input columns.
    #[must_use]
    pub fn n_inputs(&self) -> usize {
        self.expansion.bases.len()
    }

    /// Evaluates the expansion at one row.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        lasso::dot(&self.expansion.design_row(row), &self.coefficients)
    }
}
