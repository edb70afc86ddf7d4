use crate::error::ConfigError;

/// Whether the criterion is minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl Direction {
    /// Factor applied to criterion and gradient so that backends always minimize.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Minimize => 1.0,
            Direction::Maximize => -1.0,
        }
    }
}

/// Finite-difference scheme used when no closed-form gradient is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericalDerivative {
    Forward,
    #[default]
    Central,
}

/// Configuration for the annealing proposal (in the optimizer's internal space).
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedAnnealingConfig {
    /// Initial temperature handed to the solver.
    pub init_temp: f64,

    /// Small-move half-width at `init_temp` (uniform in [-small_step, small_step]).
    pub small_step_init: f64,
    /// Small-move half-width as temp -> 0.
    pub small_step_min: f64,

    /// Big-jump scale at `init_temp` (Cauchy / heavy-tailed).
    ///
    /// For parameters with a one-sided bound the internal space is logarithmic,
    /// so `ln(10)` is about a 10x jump of the distance to the bound.
    pub big_step_init: f64,
    /// Big-jump scale as temp -> 0.
    pub big_step_min: f64,

    /// Probability of using a big jump at `init_temp`.
    pub p_big_init: f64,
    /// Probability of using a big jump as temp -> 0.
    pub p_big_min: f64,

    /// Clamp on the absolute per-coordinate change.
    pub max_abs_step: f64,

    /// Stop after this many iterations without a new best solution.
    pub stall_best: u64,
    /// Stop after this many iterations without an accepted solution.
    pub stall_accepted: u64,
}

impl Default for SimulatedAnnealingConfig {
    fn default() -> Self {
        Self {
            init_temp: 100.0,
            small_step_init: 0.25,
            small_step_min: 0.01,
            big_step_init: std::f64::consts::LN_10,
            big_step_min: 0.10,
            p_big_init: 0.30,
            p_big_min: 0.02,
            max_abs_step: 100f64.ln(),
            stall_best: 1000,
            stall_accepted: 1000,
        }
    }
}

impl SimulatedAnnealingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("simulated_annealing.init_temp", self.init_temp)?;
        positive("simulated_annealing.small_step_min", self.small_step_min)?;
        positive("simulated_annealing.big_step_min", self.big_step_min)?;
        positive("simulated_annealing.max_abs_step", self.max_abs_step)?;
        if self.small_step_init < self.small_step_min {
            return Err(invalid(
                "simulated_annealing.small_step_init",
                "must not be smaller than small_step_min",
            ));
        }
        if self.big_step_init < self.big_step_min {
            return Err(invalid(
                "simulated_annealing.big_step_init",
                "must not be smaller than big_step_min",
            ));
        }
        probability("simulated_annealing.p_big_init", self.p_big_init)?;
        probability("simulated_annealing.p_big_min", self.p_big_min)?;
        Ok(())
    }
}

/// Options shared by every backend. Backends ignore what does not apply to them.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizeOptions {
    pub max_iterations: u64,
    /// L-BFGS stops once the gradient norm falls below this.
    pub gradient_tolerance: f64,
    /// L-BFGS stops once the change in criterion falls below this.
    pub cost_tolerance: f64,
    /// Nelder-Mead stops once the standard deviation of the simplex costs falls below this.
    pub simplex_tolerance: f64,
    pub lbfgs_memory: usize,
    /// Stop as soon as the criterion reaches this value (in the caller's direction).
    pub target_cost: Option<f64>,
    pub direction: Direction,
    pub numerical_derivative: NumericalDerivative,
    /// When false, gradient based backends require a closed-form gradient.
    pub allow_numerical_gradient: bool,
    /// Compute a finite-difference Hessian (and its inverse) at the optimum.
    pub final_hessian: bool,
    /// Seed for the annealing proposal RNG.
    pub seed: u64,
    pub simulated_annealing: SimulatedAnnealingConfig,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            gradient_tolerance: 1e-8,
            cost_tolerance: 1e-12,
            simplex_tolerance: 1e-10,
            lbfgs_memory: 10,
            target_cost: None,
            direction: Direction::Minimize,
            numerical_derivative: NumericalDerivative::Central,
            allow_numerical_gradient: true,
            final_hessian: false,
            seed: 0,
            simulated_annealing: SimulatedAnnealingConfig::default(),
        }
    }
}

impl OptimizeOptions {
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_gradient_tolerance(mut self, tol: f64) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    pub fn with_cost_tolerance(mut self, tol: f64) -> Self {
        self.cost_tolerance = tol;
        self
    }

    pub fn with_simplex_tolerance(mut self, tol: f64) -> Self {
        self.simplex_tolerance = tol;
        self
    }

    pub fn with_lbfgs_memory(mut self, memory: usize) -> Self {
        self.lbfgs_memory = memory;
        self
    }

    pub fn with_target_cost(mut self, target: f64) -> Self {
        self.target_cost = Some(target);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_numerical_derivative(mut self, scheme: NumericalDerivative) -> Self {
        self.numerical_derivative = scheme;
        self
    }

    pub fn with_allow_numerical_gradient(mut self, allow: bool) -> Self {
        self.allow_numerical_gradient = allow;
        self
    }

    pub fn with_final_hessian(mut self, final_hessian: bool) -> Self {
        self.final_hessian = final_hessian;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_simulated_annealing_config(mut self, config: SimulatedAnnealingConfig) -> Self {
        self.simulated_annealing = config;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        non_negative("gradient_tolerance", self.gradient_tolerance)?;
        non_negative("cost_tolerance", self.cost_tolerance)?;
        non_negative("simplex_tolerance", self.simplex_tolerance)?;
        if self.lbfgs_memory == 0 {
            return Err(invalid("lbfgs_memory", "must be at least 1"));
        }
        if let Some(target) = self.target_cost {
            if !target.is_finite() {
                return Err(invalid("target_cost", format!("must be finite, got {target}")));
            }
        }
        self.simulated_annealing.validate()
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOption {
        name,
        reason: reason.into(),
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("must be finite and >= 0, got {value}")))
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("must be finite and > 0, got {value}")))
    }
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, format!("must lie in [0, 1], got {value}")))
    }
}
