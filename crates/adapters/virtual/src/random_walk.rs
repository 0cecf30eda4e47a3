//! Random-walk perturbation driving the simulated process units.

use std::collections::HashMap;

use fieldhub_app::ports::Perturbation;
use fieldhub_domain::value::Value;
use fieldhub_domain::variable::VariableSpec;
use rand::Rng;

use crate::devices::{PRESSURE, RUNNING, TEMPERATURE};

/// How one variable moves on each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Add a uniform offset in `[-span, +span]`.
    Drift(f64),
    /// Replace with a fair coin flip.
    Coin,
}

/// Per-variable random walk keyed by variable name.
///
/// Variables without a rule are left untouched.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    steps: HashMap<String, Step>,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::empty()
            .step(TEMPERATURE, Step::Drift(0.5))
            .step(PRESSURE, Step::Drift(0.01))
            .step(RUNNING, Step::Coin)
    }
}

impl RandomWalk {
    /// A walk that changes nothing until rules are added.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    /// Set the rule for `variable`, replacing any previous one.
    #[must_use]
    pub fn step(mut self, variable: impl Into<String>, step: Step) -> Self {
        let step = match step {
            Step::Drift(span) => Step::Drift(span.abs()),
            Step::Coin => Step::Coin,
        };
        self.steps.insert(variable.into(), step);
        self
    }

    #[must_use]
    pub fn get(&self, variable: &str) -> Option<Step> {
        self.steps.get(variable).copied()
    }
}

impl Perturbation for RandomWalk {
    fn next_value(&self, variable: &VariableSpec, current: Value) -> Option<Value> {
        let step = self.steps.get(&variable.name)?;
        let mut rng = rand::rng();
        match (*step, current) {
            (Step::Drift(span), Value::Float(v)) if span > 0.0 => {
                Some(Value::Float(v + rng.random_range(-span..=span)))
            }
            (Step::Drift(_), Value::Float(_)) => None,
            (Step::Coin, Value::Bool(_)) => Some(Value::Bool(rng.random_bool(0.5))),
            _ => {
                tracing::warn!(
                    variable = %variable.name,
                    kind = %variable.kind,
                    "random-walk rule does not fit variable kind"
                );
                None
            }
        }
    }
}
