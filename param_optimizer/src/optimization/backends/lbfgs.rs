use argmin::{
    core::{Executor, observers::ObserverMode},
    solver::{linesearch::MoreThuenteLineSearch, quasinewton::LBFGS},
};
use nalgebra::DVector;
use tracing::debug;

use super::{BackendOutcome, internal_target_cost, outcome_from_result};
use crate::error::OptimizeError;
use crate::optimization::algorithm::Algorithm;
use crate::optimization::observer::CostHistoryObserver;
use crate::optimization::options::OptimizeOptions;
use crate::optimization::problem::InternalProblem;

/// L-BFGS with a More-Thuente line search.
///
/// The line search enforces the strong Wolfe conditions, so a step is only
/// accepted once it also reduces the directional derivative.
pub fn run(
    problem: &InternalProblem<'_>,
    options: &OptimizeOptions,
) -> Result<BackendOutcome, OptimizeError> {
    let linesearch: MoreThuenteLineSearch<DVector<f64>, DVector<f64>, f64> =
        MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, options.lbfgs_memory)
        .with_tolerance_grad(options.gradient_tolerance)?
        .with_tolerance_cost(options.cost_tolerance)?;

    let optspace_params = problem.initial_params_optspace();
    let target_cost = internal_target_cost(problem, options);
    debug!(
        initial_params = ?optspace_params.as_slice(),
        closed_form_gradient = problem.has_closed_form_gradient(),
        "starting L-BFGS"
    );

    let observer = CostHistoryObserver::new();
    let opt_result = Executor::new(problem.clone(), solver)
        .configure(|state| {
            state
                .param(optspace_params)
                .max_iters(options.max_iterations)
                .target_cost(target_cost)
        })
        .add_observer(observer.clone(), ObserverMode::Always)
        .run()?;

    outcome_from_result(Algorithm::Lbfgs, &opt_result, observer.cost_history())
}
