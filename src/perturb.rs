//! Perturbation matrices: drawing, labeling and persisting ensemble designs.
//!
//! # Example
//!
//! ```
//! use wrf_fvcom_uq::perturb::{PerturbOptions, perturb_variables};
//! use wrf_fvcom_uq::sampler::SampleRule;
//! use wrf_fvcom_uq::variable::VariableCatalog;
//!
//! let variables = VariableCatalog::builtin().as_slice().to_vec();
//! let matrix = perturb_variables(&variables, 19, SampleRule::Korobov, &PerturbOptions::default())
//!     .unwrap();
//!
//! assert_eq!(matrix.n_runs(), 19);
//! assert_eq!(matrix.runs()[0], "2_variable_korobov_1");
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sampler::SampleRule;
use crate::types::{DEFAULT_SEED, ParamValue};
use crate::variable::Variable;

/// Options for [`perturb_variables`].
#[derive(Clone, Debug, PartialEq)]
pub struct PerturbOptions {
    /// Seed for the stochastic rules (default: 666).
    pub seed: u64,
    /// Directory in which to write the matrix. Nothing is written if `None`.
    pub output_directory: Option<PathBuf>,
}

impl Default for PerturbOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            output_directory: None,
        }
    }
}

impl PerturbOptions {
    /// Sets the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }
}

/// A labeled run × variable matrix of sampled parameter values.
///
/// Row `r` is the parameter combination of ensemble member `runs()[r]`;
/// column `c` holds values of `variables()[c]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerturbationMatrix {
    name: String,
    runs: Vec<String>,
    variables: Vec<Variable>,
    values: Vec<Vec<f64>>,
}

impl PerturbationMatrix {
    /// Assembles a matrix from labels and rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the number of rows differs from
    /// the number of run labels or a row has the wrong width, and the
    /// variable's validation error for an improper distribution.
    pub fn new(runs: Vec<String>, variables: Vec<Variable>, values: Vec<Vec<f64>>) -> Result<Self> {
        for v in &variables {
            v.validate()?;
        }
        if runs.len() != values.len() {
            return Err(Error::ShapeMismatch {
                what: "perturbation matrix rows",
                expected: runs.len(),
                got: values.len(),
            });
        }
        if let Some(row) = values.iter().find(|r| r.len() != variables.len()) {
            return Err(Error::ShapeMismatch {
                what: "perturbation matrix columns",
                expected: variables.len(),
                got: row.len(),
            });
        }
        Ok(Self {
            name: "perturbation_matrix".to_string(),
            runs,
            variables,
            values,
        })
    }

    /// Run labels.
    #[must_use]
    pub fn runs(&self) -> &[String] {
        &self.runs
    }

    /// Column variables.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Column variable names.
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(Variable::name).collect()
    }

    /// The rows of the matrix.
    #[must_use]
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Number of runs (rows).
    #[must_use]
    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }

    /// Number of variables (columns).
    #[must_use]
    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    /// All values of the named variable, in run order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if no column has that name.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self
            .variables
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        Ok(self.values.iter().map(|r| r[idx]).collect())
    }

    /// The typed parameter values of one run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `run` is out of range.
    #[allow(clippy::cast_possible_truncation)]
    pub fn run_params(&self, run: usize) -> Result<Vec<(String, ParamValue)>> {
        let row = self.values.get(run).ok_or(Error::ShapeMismatch {
            what: "run index",
            expected: self.n_runs(),
            got: run,
        })?;
        Ok(self
            .variables
            .iter()
            .zip(row)
            .map(|(v, &x)| {
                let value = if v.is_categorical() {
                    ParamValue::Int(x.round() as i64)
                } else {
                    ParamValue::Float(x)
                };
                (v.name().to_string(), value)
            })
            .collect())
    }

    /// Writes the matrix as self-describing JSON.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a matrix previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error, a shape error if the file
    /// content is inconsistent, or a validation error for a variable whose
    /// distribution is improper.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let loaded: Self = serde_json::from_reader(BufReader::new(file))?;
        Self::new(loaded.runs, loaded.variables, loaded.values)
    }
}

/// The deterministic file name of a perturbation matrix.
#[must_use]
pub fn matrix_file_name(n_variables: usize, rule: SampleRule, n_samples: usize) -> String {
    format!("perturbation_matrix_{n_variables}variables_{rule}{n_samples}.json")
}

/// Draws `number_perturbations` samples from the independent joint
/// distribution of `variables` using `rule`.
///
/// Each column is the variable's inverse CDF applied to the rule's
/// unit-hypercube design, so discrete variables come out as integer codes
/// within their bounds. When `options.output_directory` is set, the matrix is
/// also written there under [`matrix_file_name`].
///
/// # Errors
///
/// Returns [`Error::EmptyVariables`] for an empty variable list,
/// [`Error::InvalidConfig`] for zero samples, or an error from the sampler
/// or from writing the file.
pub fn perturb_variables(
    variables: &[Variable],
    number_perturbations: usize,
    rule: SampleRule,
    options: &PerturbOptions,
) -> Result<PerturbationMatrix> {
    if variables.is_empty() {
        return Err(Error::EmptyVariables);
    }
    if number_perturbations == 0 {
        return Err(Error::InvalidConfig(
            "number of perturbations must be positive".to_string(),
        ));
    }
    for v in variables {
        v.validate()?;
    }

    let n_dims = variables.len();
    let unit = rule.sampler(options.seed).sample(number_perturbations, n_dims)?;

    let values: Vec<Vec<f64>> = unit
        .iter()
        .map(|point| {
            variables
                .iter()
                .zip(point)
                .map(|(v, &u)| v.marginal_ppf(u))
                .collect()
        })
        .collect();

    let runs: Vec<String> = (1..=number_perturbations)
        .map(|k| format!("{n_dims}_variable_{rule}_{k}"))
        .collect();

    let matrix = PerturbationMatrix::new(runs, variables.to_vec(), values)?;
    trace_info!(
        n_variables = n_dims,
        n_samples = number_perturbations,
        rule = rule.as_str(),
        "perturbation matrix drawn"
    );

    if let Some(dir) = &options.output_directory {
        let path = dir.join(matrix_file_name(n_dims, rule, number_perturbations));
        matrix.save(&path)?;
        trace_info!(path = %path.display(), "perturbation matrix written");
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableCatalog;

    fn builtin() -> Vec<Variable> {
        VariableCatalog::builtin().as_slice().to_vec()
    }

    #[test]
    fn korobov_scenario() {
        let m = perturb_variables(&builtin(), 19, SampleRule::Korobov, &PerturbOptions::default())
            .unwrap();
        assert_eq!(m.n_runs(), 19);
        assert_eq!(m.n_variables(), 2);
        for row in m.values() {
            assert!([0.0, 1.0, 2.0].contains(&row[0]), "scheme {}", row[0]);
            assert!((1.0..=10.0).contains(&row[1]), "prandtl {}", row[1]);
        }
        assert_eq!(m.runs()[18], "2_variable_korobov_19");
    }

    #[test]
    fn single_variable_keeps_column_shape() {
        let vars = vec![crate::variable::fvcom_prandtl()];
        let m = perturb_variables(&vars, 5, SampleRule::Random, &PerturbOptions::default())
            .unwrap();
        assert!(m.values().iter().all(|r| r.len() == 1));
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(matches!(
            perturb_variables(&[], 5, SampleRule::Random, &PerturbOptions::default()),
            Err(Error::EmptyVariables)
        ));
        assert!(matches!(
            perturb_variables(&builtin(), 0, SampleRule::Random, &PerturbOptions::default()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn run_params_are_typed() {
        let m = perturb_variables(&builtin(), 3, SampleRule::Sobol, &PerturbOptions::default())
            .unwrap();
        let params = m.run_params(0).unwrap();
        assert!(matches!(params[0].1, ParamValue::Int(_)));
        assert!(matches!(params[1].1, ParamValue::Float(_)));
        assert!(m.run_params(3).is_err());
    }

    #[test]
    fn file_name_is_deterministic() {
        assert_eq!(
            matrix_file_name(2, SampleRule::LatinHypercube, 50),
            "perturbation_matrix_2variables_latin_hypercube50.json"
        );
    }
}
