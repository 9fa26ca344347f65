//! Perturbed physical variables and the catalog that names them.
//!
//! A [`Variable`] is immutable metadata: a name, a marginal
//! [`VariableDistribution`], a [`Unit`], and for categorical physics
//! switches a table of scheme labels keyed by integer code.
//!
//! # Example
//!
//! ```
//! use wrf_fvcom_uq::variable::{Variable, VariableCatalog};
//!
//! let catalog = VariableCatalog::builtin();
//! let pbl = catalog.get("WRF PBL_SFCLAY").unwrap();
//! assert!(pbl.is_categorical());
//! assert_eq!(pbl.scheme_label(1), Some("MYJ PBL and MOJ SFCLAY"));
//!
//! let roughness = Variable::uniform("roughness", 0.1, 0.5).unwrap();
//! assert_eq!(roughness.bounds(), (0.1, 0.5));
//! ```

use serde::{Deserialize, Serialize};

use crate::distribution::VariableDistribution;
use crate::error::{Error, Result};

/// Name of the built-in WRF boundary-layer / surface-layer scheme switch.
pub const WRF_PBL_SFCLAY: &str = "WRF PBL_SFCLAY";
/// Name of the built-in FVCOM Prandtl number.
pub const FVCOM_PRANDTL: &str = "FVCOM Prandtl";

/// A physical unit carried explicitly with each variable.
///
/// Units of the same `dimension` convert through their `scale` factor to
/// the dimension's base unit. There is no global registry: whoever needs a
/// conversion passes both units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    symbol: String,
    dimension: String,
    scale: f64,
}

impl Unit {
    /// Creates a unit with the given symbol, dimension and scale to the
    /// dimension's base unit.
    #[must_use]
    pub fn new(symbol: impl Into<String>, dimension: impl Into<String>, scale: f64) -> Self {
        Self {
            symbol: symbol.into(),
            dimension: dimension.into(),
            scale,
        }
    }

    /// The unit of a pure number.
    #[must_use]
    pub fn dimensionless() -> Self {
        Self::new("", "dimensionless", 1.0)
    }

    /// The unit symbol (empty for dimensionless).
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The physical dimension name.
    #[must_use]
    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// Convert `value` expressed in `self` into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleUnits`] when the dimensions differ.
    pub fn convert(&self, value: f64, target: &Unit) -> Result<f64> {
        if self.dimension != target.dimension {
            return Err(Error::IncompatibleUnits {
                from: self.symbol.clone(),
                to: target.symbol.clone(),
            });
        }
        Ok(value * self.scale / target.scale)
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::dimensionless()
    }
}

/// A named physical parameter perturbed in the ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    distribution: VariableDistribution,
    #[serde(default)]
    unit: Unit,
    #[serde(default)]
    schemes: Vec<(i64, String)>,
}

impl Variable {
    /// Creates a variable from a name and distribution.
    ///
    /// # Errors
    ///
    /// Returns an error if the distribution parameters are invalid.
    pub fn new(name: impl Into<String>, distribution: VariableDistribution) -> Result<Self> {
        let name = name.into();
        distribution.validate(&name)?;
        Ok(Self {
            name,
            distribution,
            unit: Unit::dimensionless(),
            schemes: Vec::new(),
        })
    }

    /// Creates a normally distributed variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStdDev`] if `std_dev` is not positive.
    pub fn gaussian(name: impl Into<String>, mean: f64, std_dev: f64) -> Result<Self> {
        Self::new(name, VariableDistribution::Gaussian { mean, std_dev })
    }

    /// Creates a continuous uniform variable on `[low, high]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `low > high`.
    pub fn uniform(name: impl Into<String>, low: f64, high: f64) -> Result<Self> {
        Self::new(name, VariableDistribution::Uniform { low, high })
    }

    /// Creates a categorical variable over the integer codes `low..=high`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `low > high`.
    pub fn discrete_uniform(name: impl Into<String>, low: i64, high: i64) -> Result<Self> {
        Self::new(name, VariableDistribution::DiscreteUniform { low, high })
    }

    /// Re-checks the distribution parameters, e.g. after deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] or [`Error::InvalidStdDev`] for an
    /// improper distribution.
    pub fn validate(&self) -> Result<()> {
        self.distribution.validate(&self.name)
    }

    /// Attaches a physical unit.
    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Attaches a human-readable label to a scheme code.
    #[must_use]
    pub fn with_scheme(mut self, code: i64, label: impl Into<String>) -> Self {
        self.schemes.retain(|(c, _)| *c != code);
        self.schemes.push((code, label.into()));
        self.schemes.sort_by_key(|(c, _)| *c);
        self
    }

    /// The variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The marginal distribution.
    #[must_use]
    pub fn distribution(&self) -> &VariableDistribution {
        &self.distribution
    }

    /// The physical unit.
    #[must_use]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Whether the variable is a categorical scheme switch.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        self.distribution.is_discrete()
    }

    /// Lower and upper bounds in physical space.
    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        self.distribution.bounds()
    }

    /// Inverse CDF of the variable's marginal at `u ∈ [0, 1]`.
    #[must_use]
    pub fn marginal_ppf(&self, u: f64) -> f64 {
        self.distribution.ppf(u)
    }

    /// The declared category codes, in ascending order. Empty for
    /// continuous variables.
    #[must_use]
    pub fn categories(&self) -> Vec<i64> {
        match self.distribution {
            VariableDistribution::DiscreteUniform { low, high } => (low..=high).collect(),
            _ => Vec::new(),
        }
    }

    /// The label attached to a scheme code, if any.
    #[must_use]
    pub fn scheme_label(&self, code: i64) -> Option<&str> {
        self.schemes
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| label.as_str())
    }

    /// All scheme labels, ordered by code.
    #[must_use]
    pub fn schemes(&self) -> &[(i64, String)] {
        &self.schemes
    }
}

/// An ordered, name-indexed set of variables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableCatalog {
    variables: Vec<Variable>,
}

impl VariableCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of variables perturbed in the coupled WRF-FVCOM ensemble.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            variables: vec![wrf_pbl_sfclay(), fvcom_prandtl()],
        }
    }

    /// Adds a variable, replacing any existing entry with the same name.
    #[must_use]
    pub fn with(mut self, variable: Variable) -> Self {
        self.insert(variable);
        self
    }

    /// Adds a variable, replacing any existing entry with the same name.
    pub fn insert(&mut self, variable: Variable) {
        if let Some(slot) = self
            .variables
            .iter_mut()
            .find(|v| v.name() == variable.name())
        {
            *slot = variable;
        } else {
            self.variables.push(variable);
        }
    }

    /// Looks up a variable by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if no variable has that name.
    pub fn get(&self, name: &str) -> Result<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }

    /// Resolves a list of names into variables, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] for the first unknown name.
    pub fn select(&self, names: &[&str]) -> Result<Vec<Variable>> {
        names.iter().map(|n| self.get(n).cloned()).collect()
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterates over the variables in insertion order.
    pub fn iter(&self) -> core::slice::Iter<'_, Variable> {
        self.variables.iter()
    }

    /// The variables as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Variable] {
        &self.variables
    }
}

impl<'a> IntoIterator for &'a VariableCatalog {
    type Item = &'a Variable;
    type IntoIter = core::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}

/// WRF planetary boundary layer and surface layer scheme, discrete uniform on `[0, 2]`.
#[must_use]
pub fn wrf_pbl_sfclay() -> Variable {
    Variable {
        name: WRF_PBL_SFCLAY.to_string(),
        distribution: VariableDistribution::DiscreteUniform { low: 0, high: 2 },
        unit: Unit::dimensionless(),
        schemes: vec![
            (0, "YSU PBL and revised MM5 SFCLAY".to_string()),
            (1, "MYJ PBL and MOJ SFCLAY".to_string()),
            (2, "MYNN2.5 PBL and MYNN SFCLAY".to_string()),
        ],
    }
}

/// FVCOM horizontal (= vertical) Prandtl number, uniform on `[1, 10]`.
#[must_use]
pub fn fvcom_prandtl() -> Variable {
    Variable {
        name: FVCOM_PRANDTL.to_string(),
        distribution: VariableDistribution::Uniform {
            low: 1.0,
            high: 10.0,
        },
        unit: Unit::dimensionless(),
        schemes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_lookup() {
        let catalog = VariableCatalog::builtin();
        assert_eq!(catalog.len(), 2);
        let pbl = catalog.get(WRF_PBL_SFCLAY).unwrap();
        assert_eq!(pbl.categories(), vec![0, 1, 2]);
        assert_eq!(pbl.scheme_label(2), Some("MYNN2.5 PBL and MYNN SFCLAY"));
        let pr = catalog.get(FVCOM_PRANDTL).unwrap();
        assert!(!pr.is_categorical());
        assert_eq!(pr.bounds(), (1.0, 10.0));
        assert!(matches!(
            catalog.get("WRF MP"),
            Err(Error::UnknownVariable(_))
        ));
    }

    #[test]
    fn insert_replaces_same_name() {
        let catalog = VariableCatalog::builtin()
            .with(Variable::uniform(FVCOM_PRANDTL, 0.5, 2.0).unwrap());
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(FVCOM_PRANDTL).unwrap().bounds(), (0.5, 2.0));
    }

    #[test]
    fn scheme_labels_stay_sorted() {
        let v = Variable::discrete_uniform("switch", 0, 2)
            .unwrap()
            .with_scheme(2, "c")
            .with_scheme(0, "a")
            .with_scheme(2, "C");
        assert_eq!(
            v.schemes(),
            &[(0, "a".to_string()), (2, "C".to_string())]
        );
        assert_eq!(v.scheme_label(1), None);
    }

    #[test]
    fn unit_conversion_is_explicit() {
        let m = Unit::new("m", "length", 1.0);
        let km = Unit::new("km", "length", 1000.0);
        let s = Unit::new("s", "time", 1.0);
        assert!((km.convert(2.5, &m).unwrap() - 2500.0).abs() < 1e-9);
        assert!(matches!(
            m.convert(1.0, &s),
            Err(Error::IncompatibleUnits { .. })
        ));
    }
}
