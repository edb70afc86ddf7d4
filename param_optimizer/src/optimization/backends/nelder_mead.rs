use argmin::{
    core::{Executor, observers::ObserverMode},
    solver::neldermead::NelderMead,
};
use nalgebra::DVector;
use tracing::debug;

use super::{BackendOutcome, internal_target_cost, outcome_from_result};
use crate::error::OptimizeError;
use crate::optimization::algorithm::Algorithm;
use crate::optimization::observer::CostHistoryObserver;
use crate::optimization::options::OptimizeOptions;
use crate::optimization::problem::InternalProblem;

const RELATIVE_STEP: f64 = 0.05;
const ZERO_STEP: f64 = 0.00025;

/// Start point plus one vertex per coordinate, each nudged along its own axis.
pub fn initial_simplex(x0: &DVector<f64>) -> Vec<DVector<f64>> {
    let mut vertices = Vec::with_capacity(x0.len() + 1);
    vertices.push(x0.clone());
    for i in 0..x0.len() {
        let mut vertex = x0.clone();
        vertex[i] = if x0[i] != 0.0 {
            x0[i] * (1.0 + RELATIVE_STEP)
        } else {
            ZERO_STEP
        };
        vertices.push(vertex);
    }
    vertices
}

/// Derivative-free Nelder-Mead.
pub fn run(
    problem: &InternalProblem<'_>,
    options: &OptimizeOptions,
) -> Result<BackendOutcome, OptimizeError> {
    let vertices = initial_simplex(&problem.initial_params_optspace());
    debug!(n_vertices = vertices.len(), "starting Nelder-Mead");

    let solver = NelderMead::new(vertices).with_sd_tolerance(options.simplex_tolerance)?;
    let target_cost = internal_target_cost(problem, options);

    let observer = CostHistoryObserver::new();
    let opt_result = Executor::new(problem.clone(), solver)
        .configure(|state| {
            state
                .max_iters(options.max_iterations)
                .target_cost(target_cost)
        })
        .add_observer(observer.clone(), ObserverMode::Always)
        .run()?;

    outcome_from_result(Algorithm::NelderMead, &opt_result, observer.cost_history())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn simplex_has_one_vertex_per_dimension_plus_start() {
        let x0 = DVector::from_vec(vec![2.0, 0.0]);
        let simplex = initial_simplex(&x0);

        assert_eq!(simplex.len(), 3);
        assert_eq!(simplex[0], x0);
        assert_approx_eq!(simplex[1][0], 2.1);
        assert_eq!(simplex[1][1], 0.0);
        assert_eq!(simplex[2][0], 2.0);
        assert_eq!(simplex[2][1], ZERO_STEP);
    }
}
