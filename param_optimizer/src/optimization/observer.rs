use std::{cell::RefCell, rc::Rc};

use argmin::core::{Error, KV, State, observers::Observe};
use tracing::debug;

/// Records the best cost after every iteration.
///
/// Clones share the same history, so a clone can be handed to the executor
/// while the original is kept to read the history afterwards.
#[derive(Clone, Default)]
pub struct CostHistoryObserver {
    cost_history: Rc<RefCell<Vec<f64>>>,
}

impl CostHistoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cost_history(&self) -> Vec<f64> {
        self.cost_history.borrow().clone()
    }

    pub fn observe_cost(&self, cost: f64) {
        self.cost_history.borrow_mut().push(cost);
    }
}

impl<I> Observe<I> for CostHistoryObserver
where
    I: State<Float = f64>,
{
    fn observe_init(&mut self, name: &str, state: &I, _kv: &KV) -> Result<(), Error> {
        debug!(solver = name, initial_cost = state.get_cost(), "solver initialized");
        Ok(())
    }

    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        let best = state.get_best_cost();
        debug!(iter = state.get_iter(), cost = state.get_cost(), best_cost = best);
        self.observe_cost(best);
        Ok(())
    }
}
