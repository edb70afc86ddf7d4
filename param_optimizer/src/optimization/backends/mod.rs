pub mod lbfgs;
pub mod nelder_mead;
pub mod simulated_annealing;

use argmin::core::{OptimizationResult as ArgminResult, State, TerminationStatus};
use nalgebra::DVector;
use tracing::debug;

use crate::error::OptimizeError;
use crate::optimization::algorithm::Algorithm;
use crate::optimization::options::OptimizeOptions;
use crate::optimization::problem::InternalProblem;

/// What a backend hands back before normalization, in internal space and
/// internal (always minimizing) direction.
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    pub solver_name: String,
    pub best_param: DVector<f64>,
    pub best_cost: f64,
    pub iterations: u64,
    pub termination: TerminationStatus,
    pub cost_history: Vec<f64>,
}

pub(crate) fn run_backend(
    algorithm: Algorithm,
    problem: &InternalProblem<'_>,
    options: &OptimizeOptions,
) -> Result<BackendOutcome, OptimizeError> {
    match algorithm {
        Algorithm::Lbfgs => lbfgs::run(problem, options),
        Algorithm::NelderMead => nelder_mead::run(problem, options),
        Algorithm::SimulatedAnnealing => simulated_annealing::run(problem, options),
    }
}

/// Target cost in the internal direction.
pub(crate) fn internal_target_cost(problem: &InternalProblem<'_>, options: &OptimizeOptions) -> f64 {
    options
        .target_cost
        .map_or(f64::NEG_INFINITY, |target| problem.sign() * target)
}

/// Pulls the fields every backend shares out of an argmin result.
pub(crate) fn outcome_from_result<O, S, I>(
    algorithm: Algorithm,
    opt_result: &ArgminResult<O, S, I>,
    cost_history: Vec<f64>,
) -> Result<BackendOutcome, OptimizeError>
where
    I: State<Param = DVector<f64>, Float = f64>,
{
    let state = &opt_result.state;
    let Some(best_param) = state.get_best_param() else {
        return Err(OptimizeError::NoBestParam {
            algorithm: algorithm.name(),
        });
    };

    let outcome = BackendOutcome {
        solver_name: tynm::type_name::<S>(),
        best_param: best_param.clone(),
        best_cost: state.get_best_cost(),
        iterations: state.get_iter(),
        termination: state.get_termination_status().clone(),
        cost_history,
    };
    debug!(
        solver = %outcome.solver_name,
        iterations = outcome.iterations,
        best_cost = outcome.best_cost,
        termination = ?outcome.termination,
        "backend finished"
    );
    Ok(outcome)
}
