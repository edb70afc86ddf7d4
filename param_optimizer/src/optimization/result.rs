use std::fmt;

use argmin::core::{TerminationReason, TerminationStatus};
use nalgebra::DMatrix;
use tracing::warn;

use crate::error::OptimizeError;
use crate::optimization::algorithm::Algorithm;
use crate::optimization::backends::BackendOutcome;
use crate::optimization::options::OptimizeOptions;
use crate::optimization::problem::InternalProblem;
use crate::params::Params;

/// Coarse outcome of a run, shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Other,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Other => "other",
        };
        f.write_str(s)
    }
}

/// Maps an argmin termination onto [`Status`].
///
/// Annealing has no convergence test of its own; its stall exits count as success.
pub fn classify(algorithm: Algorithm, termination: &TerminationStatus) -> Status {
    match termination {
        TerminationStatus::NotTerminated => Status::Other,
        TerminationStatus::Terminated(reason) => match reason {
            TerminationReason::SolverConverged | TerminationReason::TargetCostReached => {
                Status::Success
            }
            TerminationReason::SolverExit(_) if algorithm == Algorithm::SimulatedAnnealing => {
                Status::Success
            }
            TerminationReason::MaxItersReached => Status::Failure,
            _ => Status::Other,
        },
    }
}

/// Multiple of the stopping tolerances a final gradient may reach before a
/// gradient backend's convergence is rejected.
const STATIONARITY_FACTOR: f64 = 1e3;

/// Largest internal-space gradient norm accepted at a converged gradient-based optimum.
pub fn stationarity_threshold(options: &OptimizeOptions) -> f64 {
    STATIONARITY_FACTOR * options.gradient_tolerance.max(options.cost_tolerance.sqrt())
}

/// Downgrades `SolverConverged` to [`Status::Other`] when the final gradient is
/// not near zero, e.g. when the cost stopped changing because the line search stalled.
pub fn check_stationarity(
    status: Status,
    termination: &TerminationStatus,
    grad_norm: f64,
    threshold: f64,
) -> Status {
    let converged = matches!(
        termination,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    if status == Status::Success && converged && (grad_norm.is_nan() || grad_norm > threshold) {
        Status::Other
    } else {
        status
    }
}

fn termination_message(termination: &TerminationStatus) -> String {
    match termination {
        TerminationStatus::NotTerminated => "Solver did not terminate".to_string(),
        TerminationStatus::Terminated(reason) => reason.to_string(),
    }
}

/// Uniform record of a finished run.
///
/// Vectors are positionally aligned with the parameter table that was passed in.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    algorithm: Algorithm,
    status: Status,
    message: String,
    x: Vec<f64>,
    fitness: f64,
    n_evaluations: u64,
    n_evaluations_jacobian: Option<u64>,
    n_evaluations_hessian: Option<u64>,
    jacobian: Option<Vec<f64>>,
    hessian: Option<DMatrix<f64>>,
    hessian_inverse: Option<DMatrix<f64>>,
    n_iterations: u64,
    max_constraints_violations: Option<f64>,
    history: Vec<f64>,
}

impl OptimizationResult {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// True iff the status is [`Status::Success`].
    pub fn success(&self) -> bool {
        self.status == Status::Success
    }

    /// Criterion at `x`, in the caller's direction.
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn n_evaluations(&self) -> u64 {
        self.n_evaluations
    }

    pub fn n_evaluations_jacobian(&self) -> Option<u64> {
        self.n_evaluations_jacobian
    }

    pub fn n_evaluations_hessian(&self) -> Option<u64> {
        self.n_evaluations_hessian
    }

    pub fn jacobian(&self) -> Option<&[f64]> {
        self.jacobian.as_deref()
    }

    pub fn hessian(&self) -> Option<&DMatrix<f64>> {
        self.hessian.as_ref()
    }

    pub fn hessian_inverse(&self) -> Option<&DMatrix<f64>> {
        self.hessian_inverse.as_ref()
    }

    pub fn n_iterations(&self) -> u64 {
        self.n_iterations
    }

    pub fn max_constraints_violations(&self) -> Option<f64> {
        self.max_constraints_violations
    }

    /// Best criterion value after each iteration, caller's direction.
    pub fn history(&self) -> &[f64] {
        &self.history
    }
}

fn fmt_option<T: fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

fn fmt_vec(values: &[f64]) -> String {
    let inner: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", inner.join(", "))
}

fn fmt_matrix(matrix: Option<&DMatrix<f64>>) -> String {
    match matrix {
        Some(m) => {
            let rows: Vec<String> = m
                .row_iter()
                .map(|row| fmt_vec(&row.iter().copied().collect::<Vec<_>>()))
                .collect();
            format!("[{}]", rows.join(", "))
        }
        None => "None".to_string(),
    }
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "status: {}", self.status)?;
        writeln!(f, "message: {}", self.message)?;
        writeln!(f, "x: {}", fmt_vec(&self.x))?;
        writeln!(f, "success: {}", self.success())?;
        writeln!(f, "fitness: {}", self.fitness)?;
        writeln!(f, "n_evaluations: {}", self.n_evaluations)?;
        writeln!(f, "jacobian: {}", fmt_option(self.jacobian.as_deref().map(fmt_vec)))?;
        writeln!(f, "hessian: {}", fmt_matrix(self.hessian.as_ref()))?;
        writeln!(f, "n_evaluations_jacobian: {}", fmt_option(self.n_evaluations_jacobian))?;
        writeln!(f, "n_evaluations_hessian: {}", fmt_option(self.n_evaluations_hessian))?;
        writeln!(f, "n_iterations: {}", self.n_iterations)?;
        writeln!(
            f,
            "max_constraints_violations: {}",
            fmt_option(self.max_constraints_violations)
        )?;
        write!(f, "hessian_inverse: {}", fmt_matrix(self.hessian_inverse.as_ref()))
    }
}

/// Turns a backend outcome into the caller-facing record and final table.
///
/// May evaluate the user's functions again: once for the final gradient of a
/// gradient-based backend, and a finite-difference sweep when a final Hessian
/// is requested. Those calls are included in the counters.
pub(crate) fn normalize(
    algorithm: Algorithm,
    problem: &InternalProblem<'_>,
    outcome: BackendOutcome,
    options: &OptimizeOptions,
) -> Result<(OptimizationResult, Params), OptimizeError> {
    let sign = problem.sign();
    let final_params = problem.params_from_optspace(&outcome.best_param);

    let jacobian = if algorithm.uses_gradient() {
        Some(problem.model_gradient(&final_params)?)
    } else {
        None
    };

    let (hessian, hessian_inverse, n_evaluations_hessian) = if options.final_hessian {
        let hessian = problem.model_hessian(&final_params)?;
        let hessian_inverse = match &hessian {
            Some(h) => {
                let inverse = h.clone().try_inverse();
                if inverse.is_none() {
                    warn!(algorithm = %algorithm, "final Hessian is singular");
                }
                inverse
            }
            None => {
                warn!(algorithm = %algorithm, "final Hessian has non-finite entries");
                None
            }
        };
        let n_evaluations_hessian = hessian.as_ref().map(|_| 1);
        (hessian, hessian_inverse, n_evaluations_hessian)
    } else {
        (None, None, None)
    };

    let counts = problem.counts();
    let n_evaluations_jacobian = match counts.gradient() {
        0 if !algorithm.uses_gradient() => None,
        n => Some(n),
    };

    let mut status = classify(algorithm, &outcome.termination);
    let mut message = termination_message(&outcome.termination);
    if let Some(grad) = &jacobian {
        let grad_norm = problem.chain_to_optspace(&outcome.best_param, grad).norm();
        let threshold = stationarity_threshold(options);
        let checked = check_stationarity(status, &outcome.termination, grad_norm, threshold);
        if checked != status {
            warn!(
                algorithm = %algorithm,
                grad_norm,
                threshold,
                "solver reported convergence away from a stationary point"
            );
            message = format!("{message}; final gradient norm {grad_norm:e} exceeds {threshold:e}");
            status = checked;
        }
    }

    let result = OptimizationResult {
        algorithm,
        status,
        message,
        x: final_params.values(),
        fitness: sign * outcome.best_cost,
        n_evaluations: counts.criterion(),
        n_evaluations_jacobian,
        n_evaluations_hessian,
        jacobian,
        hessian,
        hessian_inverse,
        n_iterations: outcome.iterations,
        max_constraints_violations: final_params.max_bound_violation(),
        history: outcome.cost_history.iter().map(|c| sign * c).collect(),
    };
    Ok((result, final_params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Algorithm::Lbfgs, TerminationReason::SolverConverged, Status::Success; "converged")]
    #[test_case(Algorithm::NelderMead, TerminationReason::TargetCostReached, Status::Success; "target reached")]
    #[test_case(Algorithm::Lbfgs, TerminationReason::MaxItersReached, Status::Failure; "max iters")]
    #[test_case(Algorithm::SimulatedAnnealing, TerminationReason::SolverExit("BestStallIterExceeded".to_string()), Status::Success; "annealing stall")]
    #[test_case(Algorithm::NelderMead, TerminationReason::SolverExit("gave up".to_string()), Status::Other; "other solver exit")]
    #[test_case(Algorithm::Lbfgs, TerminationReason::Interrupt, Status::Other; "interrupt")]
    fn test_classify(algorithm: Algorithm, reason: TerminationReason, expected: Status) {
        let status = classify(algorithm, &TerminationStatus::Terminated(reason));
        assert_eq!(status, expected);
    }

    #[test_case(Status::Success, TerminationReason::SolverConverged, 1e-9, Status::Success; "converged at stationary point")]
    #[test_case(Status::Success, TerminationReason::SolverConverged, 1.8, Status::Other; "converged on a stalled line search")]
    #[test_case(Status::Success, TerminationReason::SolverConverged, f64::NAN, Status::Other; "nan gradient")]
    #[test_case(Status::Success, TerminationReason::TargetCostReached, 1.8, Status::Success; "target reached away from optimum")]
    #[test_case(Status::Failure, TerminationReason::MaxItersReached, 1.8, Status::Failure; "failure unchanged")]
    fn test_check_stationarity(
        status: Status,
        reason: TerminationReason,
        grad_norm: f64,
        expected: Status,
    ) {
        let termination = TerminationStatus::Terminated(reason);
        assert_eq!(
            check_stationarity(status, &termination, grad_norm, 1e-3),
            expected
        );
    }

    #[test]
    fn default_stationarity_threshold() {
        let threshold = stationarity_threshold(&OptimizeOptions::default());
        assert!((threshold - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn not_terminated_is_other() {
        assert_eq!(
            classify(Algorithm::Lbfgs, &TerminationStatus::NotTerminated),
            Status::Other
        );
    }

    #[test]
    fn display_lists_fields_in_schema_order() {
        let result = OptimizationResult {
            algorithm: Algorithm::NelderMead,
            status: Status::Failure,
            message: "Maximum number of iterations reached".to_string(),
            x: vec![1.0, 2.0],
            fitness: 5.0,
            n_evaluations: 12,
            n_evaluations_jacobian: None,
            n_evaluations_hessian: None,
            jacobian: None,
            hessian: None,
            hessian_inverse: None,
            n_iterations: 3,
            max_constraints_violations: None,
            history: vec![6.0, 5.0],
        };
        let text = result.to_string();
        let keys: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split(": ").next())
            .collect();

        assert_eq!(
            keys,
            vec![
                "status",
                "message",
                "x",
                "success",
                "fitness",
                "n_evaluations",
                "jacobian",
                "hessian",
                "n_evaluations_jacobian",
                "n_evaluations_hessian",
                "n_iterations",
                "max_constraints_violations",
                "hessian_inverse",
            ]
        );
        assert!(text.contains("x: [1, 2]"));
        assert!(text.contains("success: false"));
        assert!(!result.success());
    }
}
