pub mod argmin_impls;
pub(crate) mod finite_diff;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use anyhow::bail;
use argmin::core::Error as ArgminError;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::EvaluationError;
use crate::optimization::options::{NumericalDerivative, OptimizeOptions, SimulatedAnnealingConfig};
use crate::optimization::param_scaling::ParamScaler;
use crate::params::Params;

pub type CriterionFn<'a> = dyn Fn(&Params) -> anyhow::Result<f64> + 'a;
pub type GradientFn<'a> = dyn Fn(&Params) -> anyhow::Result<Vec<f64>> + 'a;

/// Counts of user function invocations, shared across clones of a problem.
#[derive(Clone, Debug, Default)]
pub struct EvaluationCounts {
    criterion: Rc<Cell<u64>>,
    gradient: Rc<Cell<u64>>,
}

impl EvaluationCounts {
    pub fn criterion(&self) -> u64 {
        self.criterion.get()
    }

    /// Gradient computations, closed-form or finite-difference.
    pub fn gradient(&self) -> u64 {
        self.gradient.get()
    }

    fn bump(cell: &Cell<u64>) {
        cell.set(cell.get() + 1);
    }
}

/// The user's problem as seen by an argmin backend.
///
/// Backends iterate in an unbounded internal space; this type converts to the
/// bounded model space, applies the direction sign, and counts evaluations.
#[derive(Clone)]
pub struct InternalProblem<'a> {
    criterion: &'a CriterionFn<'a>,
    gradient: Option<&'a GradientFn<'a>>,
    /// Names, order and bounds of the caller's table; values are overwritten per evaluation.
    template: Params,
    scaler: ParamScaler,
    sign: f64,
    numerical_derivative: NumericalDerivative,
    counts: EvaluationCounts,
    pub(crate) rng: Arc<Mutex<StdRng>>,
    pub(crate) sa_cfg: Option<SimulatedAnnealingConfig>,
}

impl<'a> InternalProblem<'a> {
    pub fn new(
        criterion: &'a CriterionFn<'a>,
        gradient: Option<&'a GradientFn<'a>>,
        params: &Params,
        options: &OptimizeOptions,
    ) -> Self {
        InternalProblem {
            criterion,
            gradient,
            template: params.clone(),
            scaler: ParamScaler::from_params(params),
            sign: options.direction.sign(),
            numerical_derivative: options.numerical_derivative,
            counts: EvaluationCounts::default(),
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(options.seed))),
            sa_cfg: None,
        }
    }

    pub fn with_simulated_annealing_config(mut self, sa_config: SimulatedAnnealingConfig) -> Self {
        self.sa_cfg = Some(sa_config);
        self
    }

    pub fn counts(&self) -> &EvaluationCounts {
        &self.counts
    }

    pub fn num_params(&self) -> usize {
        self.template.len()
    }

    pub fn sign(&self) -> f64 {
        self.sign
    }

    pub fn has_closed_form_gradient(&self) -> bool {
        self.gradient.is_some()
    }

    /// Start values in optimization space.
    pub fn initial_params_optspace(&self) -> DVector<f64> {
        self.scaler.model_to_opt(&self.template.values())
    }

    /// Parameter table at an optimization-space point.
    pub fn params_from_optspace(&self, opt: &DVector<f64>) -> Params {
        self.params_from_modspace(&self.scaler.opt_to_model(opt))
    }

    pub fn params_from_modspace(&self, model: &[f64]) -> Params {
        let mut params = self.template.clone();
        params.overwrite_values(model);
        params
    }

    /// Criterion in the caller's direction.
    pub fn criterion_value(&self, params: &Params) -> Result<f64, EvaluationError> {
        EvaluationCounts::bump(&self.counts.criterion);
        (self.criterion)(params).map_err(EvaluationError::Criterion)
    }

    /// Model-space gradient in the caller's direction, closed-form when available.
    pub fn model_gradient(&self, params: &Params) -> Result<Vec<f64>, EvaluationError> {
        EvaluationCounts::bump(&self.counts.gradient);
        match self.gradient {
            Some(gradient) => {
                let grad = gradient(params).map_err(EvaluationError::Gradient)?;
                if grad.len() != params.len() {
                    return Err(EvaluationError::GradientLength {
                        expected: params.len(),
                        got: grad.len(),
                    });
                }
                Ok(grad)
            }
            None => finite_diff::numerical_gradient(
                &params.values(),
                self.numerical_derivative,
                |model| self.criterion_value(&self.params_from_modspace(model)),
            ),
        }
    }

    /// Finite-difference Hessian of the criterion at `params`, caller's direction.
    pub fn model_hessian(&self, params: &Params) -> Result<Option<DMatrix<f64>>, EvaluationError> {
        finite_diff::numerical_hessian(&params.values(), |model| {
            self.model_gradient(&self.params_from_modspace(model))
        })
    }

    /// Signed criterion at an optimization-space point; this is what backends minimize.
    pub fn optspace_cost(&self, opt: &DVector<f64>) -> Result<f64, EvaluationError> {
        let params = self.params_from_optspace(opt);
        Ok(self.sign * self.criterion_value(&params)?)
    }

    /// Gradient of [`Self::optspace_cost`].
    pub fn optspace_gradient(&self, opt: &DVector<f64>) -> Result<DVector<f64>, EvaluationError> {
        let params = self.params_from_optspace(opt);
        let model_grad = self.model_gradient(&params)?;
        Ok(self.chain_to_optspace(opt, &model_grad))
    }

    /// Optimization-space gradient from a model-space gradient already taken at `opt`.
    pub fn chain_to_optspace(&self, opt: &DVector<f64>, model_grad: &[f64]) -> DVector<f64> {
        self.scaler.chain_gradient(opt, model_grad) * self.sign
    }

    fn check_dimension(&self, p: &DVector<f64>, what: &str) -> Result<(), ArgminError> {
        if p.len() != self.num_params() {
            bail!(
                "Parameter vector length ({}) for {} did not match number of parameters ({})",
                p.len(),
                what,
                self.num_params()
            );
        }
        Ok(())
    }
}
