//! Variance-based global sensitivity analysis of a surrogate.
//!
//! Main, total and joint Sobol indices are estimated with the Saltelli
//! (2010) pick-freeze scheme. With `n` base samples and `D` input columns
//! the design has `n · (D + 2)` rows: the matrices `A` and `B`, then for
//! every column `i` the matrix `A` with column `i` taken from `B`.
//!
//! Indices are first estimated per transformed column, then summed per
//! logical variable, so the one-hot columns of a scheme switch report as
//! one variable.
//!
//! # Example
//!
//! ```
//! use wrf_fvcom_uq::sensitivity::{SobolConfig, compute_sensitivities};
//! use wrf_fvcom_uq::transform::ColumnLayout;
//! use wrf_fvcom_uq::variable::Variable;
//!
//! let variables = vec![
//!     Variable::uniform("a", 0.0, 1.0).unwrap(),
//!     Variable::uniform("b", 0.0, 1.0).unwrap(),
//! ];
//! let layout = ColumnLayout::declared(&variables, true).unwrap();
//! let model = |row: &[f64]| vec![4.0 * row[0] + row[1]];
//!
//! let config = SobolConfig::default().sample_size(2000);
//! let indices = compute_sensitivities(&model, &layout, &config).unwrap();
//! assert!(indices.main[0][0] > indices.main[0][1]);
//! ```

use serde::{Deserialize, Serialize};

use crate::distribution::VariableDistribution;
use crate::error::{Error, Result};
use crate::stats;
use crate::surrogate::Predictor;
use crate::transform::{ColumnLayout, TransformedColumn};
use crate::types::DEFAULT_SEED;

/// Configuration of [`compute_sensitivities`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SobolConfig {
    /// Number of base samples `n` (default: 10 000).
    pub sample_size: usize,
    /// Seed of the base samples (default: 666).
    pub seed: u64,
}

impl Default for SobolConfig {
    fn default() -> Self {
        Self {
            sample_size: 10_000,
            seed: DEFAULT_SEED,
        }
    }
}

impl SobolConfig {
    /// Sets the number of base samples.
    #[must_use]
    pub fn sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Indices of one output for every transformed column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnIndices {
    /// First-order indices.
    pub main: Vec<f64>,
    /// Total-effect indices.
    pub total: Vec<f64>,
    /// Joint (total-sense) indices; symmetric with a zero diagonal.
    pub joint: Vec<Vec<f64>>,
}

/// Pick-freeze Sobol estimator over a fixed set of columns.
#[derive(Clone, Debug)]
pub struct SobolAnalyzer {
    marginals: Vec<VariableDistribution>,
    n_base: usize,
}

impl SobolAnalyzer {
    /// Creates an analyzer for the given transformed columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariables`] for an empty column list.
    pub fn new(columns: &[TransformedColumn]) -> Result<Self> {
        Self::from_marginals(columns.iter().map(TransformedColumn::marginal).collect())
    }

    /// Creates an analyzer from one marginal per column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariables`] for an empty list.
    pub fn from_marginals(marginals: Vec<VariableDistribution>) -> Result<Self> {
        if marginals.is_empty() {
            return Err(Error::EmptyVariables);
        }
        Ok(Self {
            marginals,
            n_base: 0,
        })
    }

    /// Number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.marginals.len()
    }

    /// Draws the `n · (D + 2)` row design.
    ///
    /// Each column of `A` and `B` is drawn through its marginal's inverse
    /// CDF, so one-hot columns hold 0 or 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `n` is zero.
    pub fn sample(&mut self, n: usize, seed: u64) -> Result<Vec<Vec<f64>>> {
        if n == 0 {
            return Err(Error::InvalidConfig(
                "Sobol sample size must be positive".to_string(),
            ));
        }
        let mut rng = fastrand::Rng::with_seed(seed);
        let draw = |rng: &mut fastrand::Rng| -> Vec<Vec<f64>> {
            (0..n)
                .map(|_| self.marginals.iter().map(|m| m.ppf(rng.f64())).collect())
                .collect()
        };
        let a = draw(&mut rng);
        let b = draw(&mut rng);

        let d = self.n_columns();
        let mut design = Vec::with_capacity(n * (d + 2));
        design.extend(a.iter().cloned());
        design.extend(b.iter().cloned());
        for i in 0..d {
            design.extend(a.iter().zip(&b).map(|(ra, rb)| {
                let mut row = ra.clone();
                row[i] = rb[i];
                row
            }));
        }

        self.n_base = n;
        trace_debug!(n_base = n, n_rows = design.len(), "Sobol design drawn");
        Ok(design)
    }

    /// Estimates the column indices of one output evaluated on the design
    /// returned by the last [`sample`](Self::sample).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `y` does not match the design and
    /// [`Error::DegenerateVariance`] if the output variance is zero or not
    /// finite.
    pub fn compute(&self, y: &[f64]) -> Result<ColumnIndices> {
        let n = self.n_base;
        let d = self.n_columns();
        if n == 0 || y.len() != n * (d + 2) {
            return Err(Error::ShapeMismatch {
                what: "Sobol outputs",
                expected: n * (d + 2),
                got: y.len(),
            });
        }

        let var = stats::variance(&y[..2 * n]);
        if !(var.is_finite() && var > 0.0) {
            return Err(Error::DegenerateVariance(var));
        }

        let y_a = &y[..n];
        let y_b = &y[n..2 * n];
        let block = |i: usize| &y[(2 + i) * n..(3 + i) * n];

        let mut main = vec![0.0; d];
        let mut total = vec![0.0; d];
        let mut joint = vec![vec![0.0; d]; d];
        for i in 0..d {
            let y_i = block(i);
            let diff: Vec<f64> = y_i.iter().zip(y_a).map(|(a, b)| a - b).collect();
            let first: Vec<f64> = diff.iter().zip(y_b).map(|(d, b)| d * b).collect();
            let squared: Vec<f64> = diff.iter().map(|d| d * d).collect();
            main[i] = stats::mean(&first) / var;
            total[i] = 0.5 * stats::mean(&squared) / var;
            for j in 0..i {
                let y_j = block(j);
                let sq: Vec<f64> = y_i.iter().zip(y_j).map(|(a, b)| (a - b).powi(2)).collect();
                let value = total[i] + total[j] - 0.5 * stats::mean(&sq) / var;
                joint[i][j] = value;
                joint[j][i] = value;
            }
        }

        Ok(ColumnIndices { main, total, joint })
    }
}

/// Sobol indices of every output mode, aggregated per logical variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensitivityIndices {
    /// Logical variable names, in column order.
    pub variable_names: Vec<String>,
    /// First-order indices, `modes × variables`.
    pub main: Vec<Vec<f64>>,
    /// Total-effect indices, `modes × variables`.
    pub total: Vec<Vec<f64>>,
    /// Joint indices of distinct variable pairs, `modes × variables ×
    /// variables`; symmetric with a zero diagonal.
    pub joint: Vec<Vec<Vec<f64>>>,
}

/// Samples the Sobol design, evaluates `predictor` once on the whole batch
/// and aggregates the column indices of every output mode per variable.
///
/// # Errors
///
/// Returns predictor errors, [`Error::ShapeMismatch`] when the predictor
/// returns rows of uneven width, and [`Error::DegenerateVariance`] when a
/// mode does not vary over the design.
pub fn compute_sensitivities<P>(
    predictor: &P,
    layout: &ColumnLayout,
    config: &SobolConfig,
) -> Result<SensitivityIndices>
where
    P: Predictor + ?Sized,
{
    let mut analyzer = SobolAnalyzer::new(layout.columns())?;
    let design = analyzer.sample(config.sample_size, config.seed)?;
    let outputs = predictor.predict(&design)?;
    if outputs.len() != design.len() {
        return Err(Error::ShapeMismatch {
            what: "predictor rows",
            expected: design.len(),
            got: outputs.len(),
        });
    }
    let n_modes = outputs.first().map_or(0, Vec::len);
    if let Some(row) = outputs.iter().find(|r| r.len() != n_modes) {
        return Err(Error::ShapeMismatch {
            what: "predictor output width",
            expected: n_modes,
            got: row.len(),
        });
    }

    let groups = layout.column_groups();
    let variable_names = layout.variable_names();
    let n_vars = variable_names.len();

    let mut result = SensitivityIndices {
        variable_names,
        main: Vec::with_capacity(n_modes),
        total: Vec::with_capacity(n_modes),
        joint: Vec::with_capacity(n_modes),
    };
    for k in 0..n_modes {
        let y: Vec<f64> = outputs.iter().map(|r| r[k]).collect();
        let indices = analyzer.compute(&y)?;

        let mut main = vec![0.0; n_vars];
        let mut total = vec![0.0; n_vars];
        let mut joint = vec![vec![0.0; n_vars]; n_vars];
        for (c, &g) in groups.iter().enumerate() {
            main[g] += indices.main[c];
            total[g] += indices.total[c];
            for (c2, &g2) in groups.iter().enumerate() {
                if g != g2 {
                    joint[g][g2] += indices.joint[c][c2];
                }
            }
        }
        result.main.push(main);
        result.total.push(total);
        result.joint.push(joint);
    }

    trace_info!(
        n_base = config.sample_size,
        n_modes,
        n_variables = n_vars,
        "Sobol indices computed"
    );
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::variable::{Variable, VariableCatalog};

    fn uniform_analyzer(d: usize) -> SobolAnalyzer {
        SobolAnalyzer::from_marginals(vec![
            VariableDistribution::Uniform {
                low: 0.0,
                high: 1.0
            };
            d
        ])
        .unwrap()
    }

    #[test]
    fn design_layout() {
        let mut analyzer = uniform_analyzer(3);
        let design = analyzer.sample(5, 1).unwrap();
        assert_eq!(design.len(), 25);
        // Block i equals A except for column i, which comes from B.
        for r in 0..5 {
            let a = &design[r];
            let b = &design[5 + r];
            let ab1 = &design[15 + r];
            assert_eq!(ab1[0], a[0]);
            assert_eq!(ab1[1], b[1]);
            assert_eq!(ab1[2], a[2]);
        }
    }

    #[test]
    fn additive_function_indices() {
        // f = x0 + 2 x1: S = T = [1/5, 4/5], no interaction.
        let mut analyzer = uniform_analyzer(2);
        let design = analyzer.sample(20_000, 666).unwrap();
        let y: Vec<f64> = design.iter().map(|r| r[0] + 2.0 * r[1]).collect();
        let idx = analyzer.compute(&y).unwrap();
        assert!((idx.main[0] - 0.2).abs() < 0.03, "{idx:?}");
        assert!((idx.main[1] - 0.8).abs() < 0.03, "{idx:?}");
        assert!((idx.total[0] - 0.2).abs() < 0.03, "{idx:?}");
        assert!((idx.total[1] - 0.8).abs() < 0.03, "{idx:?}");
        assert!(idx.joint[0][1].abs() < 0.05, "{idx:?}");
        assert!(idx.main.iter().sum::<f64>() <= 1.05);
    }

    #[test]
    fn constant_output_is_degenerate() {
        let mut analyzer = uniform_analyzer(2);
        let design = analyzer.sample(10, 1).unwrap();
        let y = vec![3.0; design.len()];
        assert!(matches!(analyzer.compute(&y), Err(Error::DegenerateVariance(_))));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut analyzer = uniform_analyzer(2);
        analyzer.sample(10, 1).unwrap();
        assert!(matches!(analyzer.compute(&[1.0; 5]), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn category_columns_are_binary_and_aggregated() {
        let layout = ColumnLayout::declared(VariableCatalog::builtin().as_slice(), true).unwrap();
        let mut analyzer = SobolAnalyzer::new(layout.columns()).unwrap();
        let design = analyzer.sample(50, 2).unwrap();
        assert!(design.iter().all(|r| r[..3].iter().all(|&v| v == 0.0 || v == 1.0)));

        let model = |row: &[f64]| vec![row[1] + row[3], row[3]];
        let config = SobolConfig::default().sample_size(5000);
        let indices = compute_sensitivities(&model, &layout, &config).unwrap();
        assert_eq!(indices.variable_names, vec!["WRF PBL_SFCLAY", "FVCOM Prandtl"]);
        assert_eq!(indices.main.len(), 2);
        assert!(indices.main[1][0].abs() < 0.05);
        assert!((indices.main[1][1] - 1.0).abs() < 0.05);
        assert!(indices.total[0].iter().all(|&t| t >= 0.0));
    }

    #[test]
    fn gaussian_columns_follow_their_marginal() {
        let vars = vec![Variable::gaussian("g", 0.0, 1.0).unwrap()];
        let layout = ColumnLayout::declared(&vars, false).unwrap();
        let mut analyzer = SobolAnalyzer::new(layout.columns()).unwrap();
        let design = analyzer.sample(4000, 3).unwrap();
        let a: Vec<f64> = design[..4000].iter().map(|r| r[0]).collect();
        assert!(stats::mean(&a).abs() < 0.1);
        assert!((stats::variance(&a) - 1.0).abs() < 0.1);
    }
}
