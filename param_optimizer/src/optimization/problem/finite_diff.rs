//! Finite-difference gradients and Hessians over model-space parameter vectors.
//!
//! `finitediff` takes closures returning plain numbers, so errors raised by the
//! user's functions are parked in a `RefCell` during the sweep and returned
//! once it finishes.
use std::cell::RefCell;

use finitediff::FiniteDiff;
use nalgebra::DMatrix;

use crate::error::EvaluationError;
use crate::optimization::options::NumericalDerivative;

/// Gradient of a scalar function at `x`.
///
/// After the first failing evaluation the remaining points are skipped and
/// the captured error is returned.
pub(crate) fn numerical_gradient<F>(
    x: &[f64],
    scheme: NumericalDerivative,
    f: F,
) -> Result<Vec<f64>, EvaluationError>
where
    F: Fn(&[f64]) -> Result<f64, EvaluationError>,
{
    let closure_err: RefCell<Option<EvaluationError>> = RefCell::new(None);
    let func = |v: &Vec<f64>| -> f64 {
        if closure_err.borrow().is_some() {
            return f64::NAN;
        }
        match f(v.as_slice()) {
            Ok(value) => value,
            Err(err) => {
                closure_err.replace(Some(err));
                f64::NAN
            }
        }
    };

    let point = x.to_vec();
    let grad = match scheme {
        NumericalDerivative::Forward => point.forward_diff(&func),
        NumericalDerivative::Central => point.central_diff(&func),
    };
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    Ok(grad)
}

/// Central-difference Hessian from a gradient function, symmetrized.
///
/// Returns `Ok(None)` when the approximation has the wrong shape or any
/// non-finite entry.
pub(crate) fn numerical_hessian<G>(x: &[f64], grad: G) -> Result<Option<DMatrix<f64>>, EvaluationError>
where
    G: Fn(&[f64]) -> Result<Vec<f64>, EvaluationError>,
{
    let dim = x.len();
    let closure_err: RefCell<Option<EvaluationError>> = RefCell::new(None);
    let func = |v: &Vec<f64>| -> Vec<f64> {
        if closure_err.borrow().is_some() {
            return vec![f64::NAN; dim];
        }
        match grad(v.as_slice()) {
            Ok(g) => g,
            Err(err) => {
                closure_err.replace(Some(err));
                vec![f64::NAN; dim]
            }
        }
    };

    let rows = x.to_vec().central_hessian(&func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    if rows.len() != dim || rows.iter().any(|row| row.len() != dim) {
        return Ok(None);
    }
    let mut hess = DMatrix::from_fn(dim, dim, |i, j| rows[i][j]);
    if hess.iter().any(|v| !v.is_finite()) {
        return Ok(None);
    }
    symmetrize_hess(&mut hess);
    Ok(Some(hess))
}

/// Replaces each off-diagonal pair with its average.
fn symmetrize_hess(hess: &mut DMatrix<f64>) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[(i, j)] + hess[(j, i)]);
            hess[(i, j)] = avg;
            hess[(j, i)] = avg;
        }
    }
}
