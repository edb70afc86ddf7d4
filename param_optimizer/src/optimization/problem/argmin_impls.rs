use anyhow::{anyhow, bail};
use argmin::{
    core::{CostFunction, Error as ArgminError, Gradient},
    solver::simulatedannealing::Anneal,
};
use nalgebra::DVector;
use rand::{distr, prelude::*};

use super::InternalProblem;

impl CostFunction for InternalProblem<'_> {
    type Param = DVector<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        self.check_dimension(p, "cost function")?;
        let cost = self.optspace_cost(p)?;
        if cost.is_nan() {
            bail!("Criterion returned NaN at {:?}", self.params_from_optspace(p).values());
        }
        Ok(cost)
    }
}

impl Gradient for InternalProblem<'_> {
    type Param = DVector<f64>;
    type Gradient = DVector<f64>;

    fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, ArgminError> {
        self.check_dimension(p, "gradient function")?;
        Ok(self.optspace_gradient(p)?)
    }
}

impl Anneal for InternalProblem<'_> {
    type Param = DVector<f64>;
    type Output = DVector<f64>;
    type Float = f64;

    /// Proposes a neighbor by modifying exactly one coordinate.
    ///
    /// - Uses a temperature-scaled mixture:
    ///   - small uniform step (local exploration)
    ///   - occasional Cauchy (heavy-tailed) big jump (order-of-magnitude moves for log-linked parameters)
    /// - Persists RNG state across calls, seeded from the options.
    fn anneal(&self, p: &Self::Param, temp: Self::Float) -> Result<Self::Output, ArgminError> {
        self.check_dimension(p, "anneal function")?;

        let Some(sa_cfg) = self.sa_cfg.as_ref() else {
            bail!("Simulated annealing config not set on annealing problem");
        };

        // tau ~ 1 => "hot" => larger steps & more frequent big jumps
        // tau ~ 0 => "cold" => smaller steps & rarer big jumps
        let tau = if sa_cfg.init_temp > 0.0 {
            (temp / sa_cfg.init_temp).clamp(0.0, 1.0)
        } else {
            0.0
        };

        #[inline]
        fn lerp(lo: f64, hi: f64, t: f64) -> f64 {
            lo + (hi - lo) * t
        }

        let small_step = lerp(sa_cfg.small_step_min, sa_cfg.small_step_init, tau);
        let big_step = lerp(sa_cfg.big_step_min, sa_cfg.big_step_init, tau);
        let p_big = lerp(sa_cfg.p_big_min, sa_cfg.p_big_init, tau).clamp(0.0, 1.0);

        let mut out = p.clone();

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| anyhow!("Annealing RNG mutex poisoned"))?;

        let idx = rng.random_range(0..p.len());

        let mut delta = if rng.random_bool(p_big) {
            // Standard Cauchy sample from u ~ (0, 1): tan(pi*(u - 0.5))
            let u: f64 = rng.sample(distr::Open01);
            let cauchy = (std::f64::consts::PI * (u - 0.5)).tan();
            big_step * cauchy
        } else {
            rng.random_range(-small_step..small_step)
        };

        // Keeps extreme tails from overflowing the exponential links.
        delta = delta.clamp(-sa_cfg.max_abs_step, sa_cfg.max_abs_step);

        out[idx] += delta;
        Ok(out)
    }
}
