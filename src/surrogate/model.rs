//! Trained surrogate models and the [`Predictor`] abstraction.

use crate::error::{Error, Result};
use crate::surrogate::boosting::GradientBoosting;
use crate::surrogate::forest::RandomForest;
use crate::surrogate::pce::PolynomialChaos;

/// Anything that maps a batch of input rows to output rows.
///
/// Implemented by [`SurrogateModel`] and by plain closures of the form
/// `Fn(&[f64]) -> Vec<f64>`, which are applied row by row.
///
/// # Examples
///
/// ```
/// use wrf_fvcom_uq::surrogate::Predictor;
///
/// let doubler = |row: &[f64]| row.iter().map(|v| 2.0 * v).collect::<Vec<_>>();
/// let out = doubler.predict(&[vec![1.0, 2.0]]).unwrap();
/// assert_eq!(out, vec![vec![2.0, 4.0]]);
/// ```
pub trait Predictor {
    /// Predicts one output row per input row.
    ///
    /// # Errors
    ///
    /// Implementations return an error for inputs they cannot evaluate,
    /// such as rows of the wrong width.
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}

impl<F> Predictor for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        Ok(rows.iter().map(|r| self(r)).collect())
    }
}

/// A fitted surrogate.
#[derive(Clone, Debug)]
pub enum SurrogateModel {
    /// A multi-output random forest or decision tree.
    Forest(RandomForest),
    /// A single-output gradient-boosting model.
    Boosting(GradientBoosting),
    /// A single-output polynomial chaos expansion.
    Chaos(PolynomialChaos),
    /// One single-output model per output mode, concatenated.
    PerMode(Vec<SurrogateModel>),
    /// Models fitted on cross-validation folds; predictions are averaged.
    Ensemble(Vec<SurrogateModel>),
}

impl SurrogateModel {
    /// Number of input columns the model expects.
    #[must_use]
    pub fn n_inputs(&self) -> usize {
        match self {
            Self::Forest(m) => m.n_inputs(),
            Self::Boosting(m) => m.n_inputs(),
            Self::Chaos(m) => m.n_inputs(),
            Self::PerMode(ms) | Self::Ensemble(ms) => ms.first().map_or(0, Self::n_inputs),
        }
    }

    /// Number of outputs per row.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        match self {
            Self::Forest(m) => m.n_outputs(),
            Self::Boosting(_) | Self::Chaos(_) => 1,
            Self::PerMode(ms) => ms.iter().map(Self::n_outputs).sum(),
            Self::Ensemble(ms) => ms.first().map_or(0, Self::n_outputs),
        }
    }

    /// Predicts a single row; the width is assumed to be checked.
    #[allow(clippy::cast_precision_loss)]
    fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        match self {
            Self::Forest(m) => m.predict_row(row),
            Self::Boosting(m) => vec![m.predict_row(row)],
            Self::Chaos(m) => vec![m.predict_row(row)],
            Self::PerMode(ms) => ms.iter().flat_map(|m| m.predict_row(row)).collect(),
            Self::Ensemble(ms) => {
                let mut out = vec![0.0; self.n_outputs()];
                for m in ms {
                    for (acc, v) in out.iter_mut().zip(m.predict_row(row)) {
                        *acc += v;
                    }
                }
                let n = ms.len().max(1) as f64;
                out.iter_mut().for_each(|v| *v /= n);
                out
            }
        }
    }
}

impl Predictor for SurrogateModel {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let width = self.n_inputs();
        if let Some(row) = rows.iter().find(|r| r.len() != width) {
            return Err(Error::ShapeMismatch {
                what: "surrogate input row",
                expected: width,
                got: row.len(),
            });
        }
        Ok(rows.iter().map(|r| self.predict_row(r)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(offset: f64) -> SurrogateModel {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<Vec<f64>> = x.iter().map(|r| vec![r[0] + offset, offset]).collect();
        SurrogateModel::Forest(RandomForest::fit(&x, &y, 1, 1.0, false, 0))
    }

    #[test]
    fn ensemble_averages_members() {
        let model = SurrogateModel::Ensemble(vec![forest(0.0), forest(2.0)]);
        let out = model.predict(&[vec![3.0]]).unwrap();
        assert_eq!(out, vec![vec![4.0, 1.0]]);
    }

    #[test]
    fn per_mode_concatenates_outputs() {
        let model = SurrogateModel::PerMode(vec![forest(0.0), forest(1.0)]);
        assert_eq!(model.n_outputs(), 4);
        let out = model.predict(&[vec![2.0]]).unwrap();
        assert_eq!(out, vec![vec![2.0, 0.0, 3.0, 1.0]]);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let err = forest(0.0).predict(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 1, got: 2, .. }));
    }
}
