//! Device — a named aggregate of variables and methods.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::variable::VariableSpec;

/// Read-only description of a registered device.
///
/// Produced by the registry; holding one does not keep any live value alive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Variables in declaration order.
    pub variables: Vec<VariableSpec>,
    /// Zero-argument method names in declaration order.
    pub methods: Vec<String>,
}

impl Device {
    /// Look up a variable declaration by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m == name)
    }
}
