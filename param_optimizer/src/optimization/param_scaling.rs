use nalgebra::DVector;

use crate::params::{Param, Params};

/// Logarithmic mapping from constrained model space (lb, +inf) to unconstrained optimization space (-inf, +inf).
///
/// Scaled with respect to a "prior" (the start value) so that the prior maps to 0.0.
pub fn scaled_log_link(p: f64, prior: f64, lb: f64) -> f64 {
    debug_assert!(p > lb, "p must be greater than lb, got p={} lb={}", p, lb);
    debug_assert!(
        prior > lb,
        "prior must be greater than lb, got prior={} lb={}",
        prior,
        lb
    );
    ((p - lb) / (prior - lb)).ln()
}

/// Inverse of `scaled_log_link`, mapping from unconstrained optimization space (-inf, +inf) to constrained model space (lb, +inf).
pub fn scaled_log_link_inv(x: f64, prior: f64, lb: f64) -> f64 {
    debug_assert!(
        prior > lb,
        "prior must be greater than lb, got prior={} lb={}",
        prior,
        lb
    );
    x.exp() * (prior - lb) + lb
}

fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Largest float below 1.0.
const ONE_BELOW: f64 = 1.0 - f64::EPSILON / 2.0;

/// Log-odds of `u`, with `u` kept inside (0, 1) so the result stays finite.
fn logit(u: f64) -> f64 {
    let u = u.clamp(f64::MIN_POSITIVE, ONE_BELOW);
    (u / (1.0 - u)).ln()
}

/// Moves a model value that rounded onto (or past) a bound to the nearest interior float.
///
/// The links saturate in floating point, but a returned table must still be a valid start.
pub fn strictly_inside(x: f64, lb: f64, ub: f64) -> f64 {
    if x <= lb {
        lb.next_up()
    } else if x >= ub {
        ub.next_down()
    } else {
        x
    }
}

/// Per-parameter link between model space and the unbounded space a backend iterates in.
///
/// Every link maps internal 0.0 to the parameter's start value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link {
    Identity,
    /// `(lb, +inf)`
    Lower { lb: f64, prior: f64 },
    /// `(-inf, ub)`, the lower link mirrored around `ub`.
    Upper { ub: f64, prior: f64 },
    /// `(lb, ub)` through a shifted logistic.
    Interval { lb: f64, width: f64, offset: f64 },
}

impl Link {
    /// Chooses the link for a validated parameter.
    pub fn for_param(param: &Param) -> Self {
        let (lb, ub, prior) = (param.lower_bound, param.upper_bound, param.value);
        match (lb.is_finite(), ub.is_finite()) {
            (false, false) => Link::Identity,
            (true, false) => Link::Lower { lb, prior },
            (false, true) => Link::Upper { ub, prior },
            (true, true) => {
                let width = ub - lb;
                Link::Interval {
                    lb,
                    width,
                    offset: logit((prior - lb) / width),
                }
            }
        }
    }

    pub fn to_model(&self, z: f64) -> f64 {
        match *self {
            Link::Identity => z,
            Link::Lower { lb, prior } => {
                strictly_inside(scaled_log_link_inv(z, prior, lb), lb, f64::INFINITY)
            }
            Link::Upper { ub, prior } => {
                strictly_inside(-scaled_log_link_inv(z, -prior, -ub), f64::NEG_INFINITY, ub)
            }
            Link::Interval { lb, width, offset } => {
                strictly_inside(lb + width * logistic(z + offset), lb, lb + width)
            }
        }
    }

    pub fn to_internal(&self, x: f64) -> f64 {
        match *self {
            Link::Identity => x,
            Link::Lower { lb, prior } => scaled_log_link(x, prior, lb),
            Link::Upper { ub, prior } => scaled_log_link(-x, -prior, -ub),
            Link::Interval { lb, width, offset } => logit((x - lb) / width) - offset,
        }
    }

    /// `d model / d internal` at internal point `z`.
    pub fn derivative(&self, z: f64) -> f64 {
        match *self {
            Link::Identity => 1.0,
            Link::Lower { lb, prior } => z.exp() * (prior - lb),
            Link::Upper { ub, prior } => -(z.exp() * (ub - prior)),
            Link::Interval { width, offset, .. } => {
                let s = logistic(z + offset);
                width * s * (1.0 - s)
            }
        }
    }
}

/// Forward and inverse parameter scaling between (constrained) model space and optimization (unconstrained) parameter space.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamScaler {
    links: Vec<Link>,
}

impl ParamScaler {
    pub fn from_params(params: &Params) -> Self {
        Self {
            links: params.iter().map(Link::for_param).collect(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.links.iter().all(|l| *l == Link::Identity)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn model_to_opt(&self, model: &[f64]) -> DVector<f64> {
        debug_assert_eq!(model.len(), self.links.len());
        DVector::from_iterator(
            self.links.len(),
            self.links.iter().zip(model).map(|(l, &x)| l.to_internal(x)),
        )
    }

    pub fn opt_to_model(&self, opt: &DVector<f64>) -> Vec<f64> {
        debug_assert_eq!(opt.len(), self.links.len());
        self.links
            .iter()
            .zip(opt.iter())
            .map(|(l, &z)| l.to_model(z))
            .collect()
    }

    /// Chain rule: turns a model-space gradient into an optimization-space gradient at `opt`.
    pub fn chain_gradient(&self, opt: &DVector<f64>, model_grad: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            self.links.len(),
            self.links
                .iter()
                .zip(opt.iter())
                .zip(model_grad)
                .map(|((l, &z), &g)| g * l.derivative(z)),
        )
    }
}
