//! Dispatch facade: validates a run, hands it to one argmin backend and
//! normalizes whatever comes back into an [`OptimizationResult`].
pub mod algorithm;
pub mod backends;
pub mod observer;
pub mod options;
pub mod param_scaling;
pub mod problem;
pub mod result;

#[cfg(test)]
mod tests;

use tracing::info;

use crate::error::{ConfigError, OptimizeError};
use crate::params::Params;
use algorithm::Algorithm;
use options::{Direction, OptimizeOptions};
use problem::{CriterionFn, GradientFn, InternalProblem};
use result::OptimizationResult;

/// A configured optimization run.
///
/// ```ignore
/// let (res, params) = Minimize::new(criterion, &params, "lbfgs")?
///     .with_gradient(gradient)
///     .with_options(OptimizeOptions::default().with_final_hessian(true))
///     .run()?;
/// ```
pub struct Minimize<'a> {
    criterion: Box<CriterionFn<'a>>,
    gradient: Option<Box<GradientFn<'a>>>,
    params: Params,
    algorithm: Algorithm,
    options: OptimizeOptions,
}

impl<'a> Minimize<'a> {
    /// Fails with [`ConfigError::UnknownAlgorithm`] before anything is evaluated.
    pub fn new<F>(criterion: F, params: &Params, algorithm: &str) -> Result<Self, OptimizeError>
    where
        F: Fn(&Params) -> anyhow::Result<f64> + 'a,
    {
        let algorithm: Algorithm = algorithm.parse()?;
        Ok(Self {
            criterion: Box::new(criterion),
            gradient: None,
            params: params.clone(),
            algorithm,
            options: OptimizeOptions::default(),
        })
    }

    /// Closed-form gradient, one entry per parameter in table order.
    pub fn with_gradient<G>(mut self, gradient: G) -> Self
    where
        G: Fn(&Params) -> anyhow::Result<Vec<f64>> + 'a,
    {
        self.gradient = Some(Box::new(gradient));
        self
    }

    pub fn with_options(mut self, options: OptimizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    /// Runs the backend to termination.
    ///
    /// Returns the result record and a copy of the input table holding the
    /// optimum. Every call starts fresh counters.
    pub fn run(&self) -> Result<(OptimizationResult, Params), OptimizeError> {
        self.params.validate()?;
        self.options.validate()?;
        if self.algorithm.uses_gradient()
            && self.gradient.is_none()
            && !self.options.allow_numerical_gradient
        {
            return Err(ConfigError::GradientRequired {
                algorithm: self.algorithm.name(),
            }
            .into());
        }

        info!(
            algorithm = %self.algorithm,
            n_params = self.params.len(),
            direction = ?self.options.direction,
            closed_form_gradient = self.gradient.is_some(),
            "starting optimization"
        );

        let criterion: &CriterionFn<'_> = self.criterion.as_ref();
        let gradient = self
            .gradient
            .as_ref()
            .map(|g| g.as_ref() as &GradientFn<'_>);
        let problem = InternalProblem::new(criterion, gradient, &self.params, &self.options);

        let outcome = backends::run_backend(self.algorithm, &problem, &self.options)?;
        let (res, final_params) = result::normalize(self.algorithm, &problem, outcome, &self.options)?;

        info!(
            algorithm = %self.algorithm,
            status = %res.status(),
            fitness = res.fitness(),
            n_iterations = res.n_iterations(),
            n_evaluations = res.n_evaluations(),
            n_evaluations_jacobian = ?res.n_evaluations_jacobian(),
            "optimization finished"
        );
        Ok((res, final_params))
    }
}

/// Minimizes `criterion` from `params` with the backend named by `algorithm`.
pub fn minimize<F>(
    criterion: F,
    params: &Params,
    algorithm: &str,
) -> Result<(OptimizationResult, Params), OptimizeError>
where
    F: Fn(&Params) -> anyhow::Result<f64>,
{
    Minimize::new(criterion, params, algorithm)?.run()
}

pub fn minimize_with_gradient<F, G>(
    criterion: F,
    gradient: G,
    params: &Params,
    algorithm: &str,
) -> Result<(OptimizationResult, Params), OptimizeError>
where
    F: Fn(&Params) -> anyhow::Result<f64>,
    G: Fn(&Params) -> anyhow::Result<Vec<f64>>,
{
    Minimize::new(criterion, params, algorithm)?
        .with_gradient(gradient)
        .run()
}

/// Maximizes `criterion`; the result reports values in the maximizing direction.
pub fn maximize<F>(
    criterion: F,
    params: &Params,
    algorithm: &str,
) -> Result<(OptimizationResult, Params), OptimizeError>
where
    F: Fn(&Params) -> anyhow::Result<f64>,
{
    Minimize::new(criterion, params, algorithm)?
        .with_options(OptimizeOptions::default().with_direction(Direction::Maximize))
        .run()
}
