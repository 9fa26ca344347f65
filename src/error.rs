#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds for '{name}': low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The name of the offending variable.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a Gaussian variable has a non-positive standard deviation.
    #[error("invalid standard deviation for '{name}': {std_dev} must be positive")]
    InvalidStdDev {
        /// The name of the offending variable.
        name: String,
        /// The standard deviation supplied.
        std_dev: f64,
    },

    /// Returned when a variable is not present in the catalog.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Returned when an operation needs at least one variable.
    #[error("at least one variable is required")]
    EmptyVariables,

    /// Returned when a configuration string names an option that does not exist.
    #[error("{kind} '{value}' not recognized")]
    UnrecognizedOption {
        /// Which kind of option was parsed (e.g. "sample rule").
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Returned when two matrices or vectors disagree in shape.
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected size.
        expected: usize,
        /// The actual size.
        got: usize,
    },

    /// Returned when an input contains NaN or infinite values.
    #[error("non-finite values in {0}")]
    NonFiniteInput(&'static str),

    /// Returned when the output sample used for sensitivity indices has no variance.
    #[error("output variance is {0}; sensitivity indices are undefined")]
    DegenerateVariance(f64),

    /// Returned when the calibration objective evaluates to NaN or infinity.
    #[error("non-finite score {0}; the surrogate is unstable at this candidate")]
    NonFiniteScore(f64),

    /// Returned when converting between units of different physical dimensions.
    #[error("cannot convert '{from}' to '{to}': incompatible dimensions")]
    IncompatibleUnits {
        /// Source unit symbol.
        from: String,
        /// Target unit symbol.
        to: String,
    },

    /// Returned when a category code has no column in the transformed encoding.
    #[error("category {code} of '{variable}' is not represented in the encoding")]
    MissingCategory {
        /// The categorical variable.
        variable: String,
        /// The unrepresented code.
        code: i64,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when a linear-algebra step (e.g. a decomposition) fails.
    #[error("linear algebra failure: {0}")]
    LinearAlgebra(&'static str),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),

    /// Returned when reading or writing a file fails.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when a persisted file cannot be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::UnrecognizedOption`] for the given option kind.
    pub(crate) fn unrecognized(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnrecognizedOption {
            kind,
            value: value.into(),
        }
    }
}
