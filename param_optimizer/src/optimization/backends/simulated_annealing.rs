use argmin::{
    core::{Executor, observers::ObserverMode},
    solver::simulatedannealing::SimulatedAnnealing,
};
use tracing::debug;

use super::{BackendOutcome, internal_target_cost, outcome_from_result};
use crate::error::OptimizeError;
use crate::optimization::algorithm::Algorithm;
use crate::optimization::observer::CostHistoryObserver;
use crate::optimization::options::OptimizeOptions;
use crate::optimization::problem::InternalProblem;

/// Simulated annealing with stall-based stopping.
///
/// Proposals come from the problem's `Anneal` impl, whose RNG is seeded from
/// `options.seed`.
pub fn run(
    problem: &InternalProblem<'_>,
    options: &OptimizeOptions,
) -> Result<BackendOutcome, OptimizeError> {
    let sa_cfg = options.simulated_annealing.clone();
    let solver = SimulatedAnnealing::new(sa_cfg.init_temp)?
        // stop if there was no new best solution after `stall_best` iterations
        .with_stall_best(sa_cfg.stall_best)
        // stop if there was no accepted solution after `stall_accepted` iterations
        .with_stall_accepted(sa_cfg.stall_accepted);

    let problem = problem.clone().with_simulated_annealing_config(sa_cfg);
    let optspace_params = problem.initial_params_optspace();
    let target_cost = internal_target_cost(&problem, options);
    debug!(initial_params = ?optspace_params.as_slice(), "starting simulated annealing");

    let observer = CostHistoryObserver::new();
    let opt_result = Executor::new(problem, solver)
        .configure(|state| {
            state
                .param(optspace_params)
                .max_iters(options.max_iterations)
                .target_cost(target_cost)
        })
        .add_observer(observer.clone(), ObserverMode::Always)
        .run()?;

    outcome_from_result(
        Algorithm::SimulatedAnnealing,
        &opt_result,
        observer.cost_history(),
    )
}
