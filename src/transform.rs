//! Surrogate-ready encodings of perturbation matrices.
//!
//! Categorical scheme switches become one-hot columns (one per encoded
//! code, ascending) and continuous variables become a single column,
//! optionally rescaled to `[0, 1]` with the variable's declared bounds.
//! Columns follow the order of the source variables.
//!
//! The [`ColumnLayout`] produced for a training matrix is reusable: the
//! calibration search encodes one candidate at a time with
//! [`ColumnLayout::encode_row`].

use serde::{Deserialize, Serialize};

use crate::distribution::VariableDistribution;
use crate::error::{Error, Result};
use crate::perturb::PerturbationMatrix;
use crate::types::ParamValue;
use crate::variable::Variable;

/// Which category codes get a one-hot column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryEncoding {
    /// Every code in the variable's declared range.
    #[default]
    Declared,
    /// Only the codes present in the sample being transformed. Codes absent
    /// from the sample get no column.
    Observed,
}

/// Options for [`transform_perturbation_matrix`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Rescale continuous columns to `[0, 1]` (default: true).
    pub scale: bool,
    /// Category encoding (default: [`CategoryEncoding::Declared`]).
    pub encoding: CategoryEncoding,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            scale: true,
            encoding: CategoryEncoding::Declared,
        }
    }
}

impl TransformOptions {
    /// Enables or disables continuous rescaling.
    #[must_use]
    pub fn scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the category encoding.
    #[must_use]
    pub fn encoding(mut self, encoding: CategoryEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// What a transformed column holds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// A continuous variable, rescaled to `[0, 1]` when `scaled`.
    Continuous {
        /// Whether the column was rescaled.
        scaled: bool,
    },
    /// The one-hot indicator of a category code.
    Category {
        /// The scheme code this column indicates.
        code: i64,
    },
}

/// One column of a transformed matrix and the variable it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformedColumn {
    variable: Variable,
    source_index: usize,
    kind: ColumnKind,
}

impl TransformedColumn {
    /// The source variable.
    #[must_use]
    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    /// Position of the source variable in the perturbation matrix.
    #[must_use]
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    /// The column kind.
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Whether the column only takes integer values (one-hot indicators).
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self.kind, ColumnKind::Category { .. })
    }

    /// A readable column label, e.g. `WRF PBL_SFCLAY=1`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.kind {
            ColumnKind::Continuous { .. } => self.variable.name().to_string(),
            ColumnKind::Category { code } => format!("{}={code}", self.variable.name()),
        }
    }

    /// The marginal distribution of the column's values.
    ///
    /// One-hot columns are discrete on `{0, 1}`; scaled continuous columns
    /// carry the source distribution pushed through the affine rescaling.
    #[must_use]
    pub fn marginal(&self) -> VariableDistribution {
        match self.kind {
            ColumnKind::Category { .. } => {
                VariableDistribution::DiscreteUniform { low: 0, high: 1 }
            }
            ColumnKind::Continuous { scaled: false } => *self.variable.distribution(),
            ColumnKind::Continuous { scaled: true } => {
                let (low, high) = self.variable.bounds();
                let width = high - low;
                match *self.variable.distribution() {
                    VariableDistribution::Gaussian { mean, std_dev } if width > 0.0 => {
                        VariableDistribution::Gaussian {
                            mean: (mean - low) / width,
                            std_dev: std_dev / width,
                        }
                    }
                    _ => VariableDistribution::Uniform {
                        low: 0.0,
                        high: 1.0,
                    },
                }
            }
        }
    }

    /// Maps a physical value to this column's encoded value.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn encode(&self, value: f64) -> f64 {
        match self.kind {
            ColumnKind::Category { code } => {
                if value.round() as i64 == code {
                    1.0
                } else {
                    0.0
                }
            }
            ColumnKind::Continuous { scaled: false } => value,
            ColumnKind::Continuous { scaled: true } => {
                let (low, high) = self.variable.bounds();
                if high > low { (value - low) / (high - low) } else { 0.0 }
            }
        }
    }
}

/// The column structure of a transformed matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    variables: Vec<Variable>,
    columns: Vec<TransformedColumn>,
}

impl ColumnLayout {
    /// Builds the layout of the declared catalog: every declared category
    /// code gets a column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariables`] for an empty list and the
    /// variable's validation error for an improper distribution.
    pub fn declared(variables: &[Variable], scale: bool) -> Result<Self> {
        Self::build(variables, scale, |_, v| v.categories())
    }

    /// Builds the layout for a perturbation matrix under `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariables`] if the matrix has no columns.
    #[allow(clippy::cast_possible_truncation)]
    pub fn for_matrix(matrix: &PerturbationMatrix, options: &TransformOptions) -> Result<Self> {
        match options.encoding {
            CategoryEncoding::Declared => Self::declared(matrix.variables(), options.scale),
            CategoryEncoding::Observed => Self::build(matrix.variables(), options.scale, |idx, _| {
                let mut codes: Vec<i64> = matrix
                    .values()
                    .iter()
                    .map(|row| row[idx].round() as i64)
                    .collect();
                codes.sort_unstable();
                codes.dedup();
                codes
            }),
        }
    }

    fn build(
        variables: &[Variable],
        scale: bool,
        codes_for: impl Fn(usize, &Variable) -> Vec<i64>,
    ) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::EmptyVariables);
        }
        let mut columns = Vec::new();
        for (idx, variable) in variables.iter().enumerate() {
            variable.validate()?;
            if variable.is_categorical() {
                for code in codes_for(idx, variable) {
                    columns.push(TransformedColumn {
                        variable: variable.clone(),
                        source_index: idx,
                        kind: ColumnKind::Category { code },
                    });
                }
            } else {
                columns.push(TransformedColumn {
                    variable: variable.clone(),
                    source_index: idx,
                    kind: ColumnKind::Continuous { scaled: scale },
                });
            }
        }
        Ok(Self {
            variables: variables.to_vec(),
            columns,
        })
    }

    /// The source variables, in perturbation-matrix order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The transformed columns.
    #[must_use]
    pub fn columns(&self) -> &[TransformedColumn] {
        &self.columns
    }

    /// Number of transformed columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Encodes one physical parameter row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for a row of the wrong width and
    /// [`Error::MissingCategory`] when a category code has no column.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.variables.len() {
            return Err(Error::ShapeMismatch {
                what: "parameter row",
                expected: self.variables.len(),
                got: row.len(),
            });
        }
        for (idx, variable) in self.variables.iter().enumerate() {
            if variable.is_categorical() {
                let code = row[idx].round() as i64;
                let represented = self.columns.iter().any(|c| {
                    c.source_index == idx && c.kind == ColumnKind::Category { code }
                });
                if !represented {
                    return Err(Error::MissingCategory {
                        variable: variable.name().to_string(),
                        code,
                    });
                }
            }
        }
        Ok(self
            .columns
            .iter()
            .map(|c| c.encode(row[c.source_index]))
            .collect())
    }

    /// Encodes a named parameter set (e.g. an optimizer candidate).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if a variable of the layout has no
    /// value, plus the errors of [`encode_row`](Self::encode_row).
    pub fn encode_params(&self, params: &[(String, ParamValue)]) -> Result<Vec<f64>> {
        let row = parameters_to_row(&self.variables, params)?;
        self.encode_row(&row)
    }

    /// Maps a scaled continuous value of `column` back to physical space.
    ///
    /// Category and unscaled columns are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `column` is out of range.
    pub fn inverse_scale(&self, column: usize, value: f64) -> Result<f64> {
        let col = self.columns.get(column).ok_or(Error::ShapeMismatch {
            what: "column index",
            expected: self.columns.len(),
            got: column,
        })?;
        Ok(match col.kind {
            ColumnKind::Continuous { scaled: true } => {
                let (low, high) = col.variable.bounds();
                low + value * (high - low)
            }
            _ => value,
        })
    }

    /// Logical variable names in column order, without repeats.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name().to_string()).collect()
    }

    /// For every column, the index of its logical variable.
    #[must_use]
    pub fn column_groups(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.source_index).collect()
    }
}

/// A perturbation matrix re-expressed in surrogate input space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformedMatrix {
    layout: ColumnLayout,
    runs: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl TransformedMatrix {
    /// The column layout.
    #[must_use]
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// The transformed columns.
    #[must_use]
    pub fn columns(&self) -> &[TransformedColumn] {
        self.layout.columns()
    }

    /// Run labels, carried over from the perturbation matrix.
    #[must_use]
    pub fn runs(&self) -> &[String] {
        &self.runs
    }

    /// The transformed rows.
    #[must_use]
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Number of transformed columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.layout.n_columns()
    }

    /// See [`ColumnLayout::inverse_scale`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `column` is out of range.
    pub fn inverse_scale(&self, column: usize, value: f64) -> Result<f64> {
        self.layout.inverse_scale(column, value)
    }
}

/// Transforms a perturbation matrix into surrogate input space.
///
/// # Errors
///
/// Returns [`Error::EmptyVariables`] if the matrix has no columns.
pub fn transform_perturbation_matrix(
    matrix: &PerturbationMatrix,
    options: &TransformOptions,
) -> Result<TransformedMatrix> {
    let layout = ColumnLayout::for_matrix(matrix, options)?;
    let values = matrix
        .values()
        .iter()
        .map(|row| layout.encode_row(row))
        .collect::<Result<Vec<_>>>()?;
    Ok(TransformedMatrix {
        layout,
        runs: matrix.runs().to_vec(),
        values,
    })
}

/// Encodes a single physical parameter row against the declared catalog.
///
/// # Errors
///
/// Returns [`Error::EmptyVariables`] for an empty list and the errors of
/// [`ColumnLayout::encode_row`].
pub fn transform_row(
    variables: &[Variable],
    row: &[f64],
    options: &TransformOptions,
) -> Result<Vec<f64>> {
    ColumnLayout::declared(variables, options.scale)?.encode_row(row)
}

/// Arranges a named parameter set into a physical row ordered like `variables`.
///
/// # Errors
///
/// Returns [`Error::UnknownVariable`] if a variable has no value.
pub fn parameters_to_row(
    variables: &[Variable],
    params: &[(String, ParamValue)],
) -> Result<Vec<f64>> {
    variables
        .iter()
        .map(|v| {
            params
                .iter()
                .find(|(name, _)| name == v.name())
                .map(|(_, value)| value.as_f64())
                .ok_or_else(|| Error::UnknownVariable(v.name().to_string()))
        })
        .collect()
}

/// One dimension of the calibration search space.
#[derive(Clone, Debug, PartialEq)]
pub enum Dimension {
    /// A categorical scheme switch.
    Categorical {
        /// Variable name.
        name: String,
        /// Admissible scheme codes.
        choices: Vec<i64>,
    },
    /// A continuous parameter.
    Real {
        /// Variable name.
        name: String,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

impl Dimension {
    /// The variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Categorical { name, .. } | Self::Real { name, .. } => name,
        }
    }

    /// Maps a unit-interval coordinate to a value of this dimension.
    ///
    /// # Panics
    ///
    /// Panics if a categorical dimension has no choices. Spaces built by
    /// [`SearchSpace`] never do.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn from_unit(&self, u: f64) -> ParamValue {
        match self {
            Self::Categorical { choices, .. } => {
                let last = choices.len().saturating_sub(1);
                let idx = ((u * choices.len() as f64).floor() as usize).min(last);
                ParamValue::Int(choices[idx])
            }
            Self::Real { low, high, .. } => {
                ParamValue::Float(low + u.clamp(0.0, 1.0) * (high - low))
            }
        }
    }
}

/// The mixed categorical/continuous space searched by the optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSpace {
    dimensions: Vec<Dimension>,
}

impl SearchSpace {
    /// Builds the space of the declared catalog. Gaussian variables are
    /// searched over `mean ± 3 std_dev`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariables`] for an empty list, the variable's
    /// validation error for an improper distribution, and
    /// [`Error::InvalidConfig`] for a categorical variable without codes.
    pub fn from_variables(variables: &[Variable]) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::EmptyVariables);
        }
        let dimensions = variables
            .iter()
            .map(|v| {
                v.validate()?;
                if v.is_categorical() {
                    let choices = v.categories();
                    if choices.is_empty() {
                        return Err(Error::InvalidConfig(format!(
                            "no category codes for '{}'",
                            v.name()
                        )));
                    }
                    Ok(Dimension::Categorical {
                        name: v.name().to_string(),
                        choices,
                    })
                } else {
                    let (low, high) = v.bounds();
                    Ok(Dimension::Real {
                        name: v.name().to_string(),
                        low,
                        high,
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { dimensions })
    }

    /// Builds the space searched against an encoding: categorical choices
    /// are limited to the codes that have a one-hot column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariables`] for an empty layout and
    /// [`Error::InvalidConfig`] when a categorical variable has no encoded
    /// code left.
    pub fn from_layout(layout: &ColumnLayout) -> Result<Self> {
        let mut space = Self::from_variables(layout.variables())?;
        for (idx, dim) in space.dimensions.iter_mut().enumerate() {
            if let Dimension::Categorical { choices, .. } = dim {
                choices.retain(|&code| {
                    layout.columns.iter().any(|c| {
                        c.source_index == idx && c.kind == ColumnKind::Category { code }
                    })
                });
                if choices.is_empty() {
                    return Err(Error::InvalidConfig(format!(
                        "no encoded category for '{}'",
                        layout.variables[idx].name()
                    )));
                }
            }
        }
        Ok(space)
    }

    /// The dimensions, in variable order.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Whether the space has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Maps a unit-hypercube point to a named parameter set.
    #[must_use]
    pub fn point_from_unit(&self, unit: &[f64]) -> Vec<(String, ParamValue)> {
        self.dimensions
            .iter()
            .zip(unit)
            .map(|(d, &u)| (d.name().to_string(), d.from_unit(u)))
            .collect()
    }
}
