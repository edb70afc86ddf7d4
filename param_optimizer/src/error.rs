use thiserror::Error;

/// Problems with the run configuration, detected before the criterion is evaluated.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown algorithm '{name}'; available algorithms: {available}")]
    UnknownAlgorithm { name: String, available: String },

    #[error(
        "Algorithm '{algorithm}' needs a gradient; supply one or allow numerical gradients"
    )]
    GradientRequired { algorithm: &'static str },

    #[error("Invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

/// A malformed parameter table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("Parameter table is empty")]
    Empty,

    #[error("Parameter '{name}' has non-finite value {value}")]
    NonFiniteValue { name: String, value: f64 },

    #[error("Parameter name '{name}' appears more than once")]
    DuplicateName { name: String },

    #[error("Parameter '{name}' has lower bound {lower} >= upper bound {upper}")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    #[error("Parameter '{name}' starts at {value}, not strictly inside ({lower}, {upper})")]
    StartOutsideBounds {
        name: String,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Expected {expected} values for the parameter table, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Failure raised while evaluating the user's criterion or gradient.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("criterion failed: {0}")]
    Criterion(#[source] anyhow::Error),

    #[error("gradient failed: {0}")]
    Gradient(#[source] anyhow::Error),

    #[error("gradient has {got} entries but the parameter table has {expected}")]
    GradientLength { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Argmin error: {0}")]
    Argmin(argmin::core::Error),

    #[error("Backend '{algorithm}' finished without a best parameter vector")]
    NoBestParam { algorithm: &'static str },
}

/// Errors coming back out of argmin may carry an [`EvaluationError`] raised by
/// the criterion or gradient; those are surfaced as evaluation errors.
impl From<argmin::core::Error> for OptimizeError {
    fn from(err: argmin::core::Error) -> Self {
        match err.downcast::<EvaluationError>() {
            Ok(eval_err) => OptimizeError::Evaluation(eval_err),
            Err(err) => OptimizeError::Argmin(err),
        }
    }
}
