use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Optimization backends that can be selected by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// argmin's L-BFGS with a More-Thuente line search.
    Lbfgs,
    /// argmin's Nelder-Mead simplex method.
    NelderMead,
    /// argmin's simulated annealing with a temperature-scaled mixture proposal.
    SimulatedAnnealing,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::Lbfgs,
        Algorithm::NelderMead,
        Algorithm::SimulatedAnnealing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Lbfgs => "lbfgs",
            Algorithm::NelderMead => "nelder_mead",
            Algorithm::SimulatedAnnealing => "simulated_annealing",
        }
    }

    /// Whether the backend requests gradients from the problem.
    pub fn uses_gradient(&self) -> bool {
        match self {
            Algorithm::Lbfgs => true,
            Algorithm::NelderMead | Algorithm::SimulatedAnnealing => false,
        }
    }

    /// Comma separated list of every identifier, for error messages.
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(Algorithm::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifiers are case-insensitive and accept `-` for `_`.
impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|algo| algo.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownAlgorithm {
                name: s.to_string(),
                available: Self::available(),
            })
    }
}
