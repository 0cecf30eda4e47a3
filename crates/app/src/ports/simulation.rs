//! Simulation port — the rule that perturbs variables on every tick.

use fieldhub_domain::value::Value;
use fieldhub_domain::variable::VariableSpec;

/// Computes the next simulated value of a variable.
pub trait Perturbation: Send + Sync {
    /// Next value for `variable` given its `current` value, or `None` to
    /// leave it untouched this tick. Rounding to the variable's precision is
    /// applied by the write path, not here.
    fn next_value(&self, variable: &VariableSpec, current: Value) -> Option<Value>;
}

impl<T: Perturbation + ?Sized> Perturbation for std::sync::Arc<T> {
    fn next_value(&self, variable: &VariableSpec, current: Value) -> Option<Value> {
        (**self).next_value(variable, current)
    }
}
