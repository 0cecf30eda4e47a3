//! Variable — a named, typed, versioned data point owned by a device.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FieldHubError, TypeMismatchError, ValidationError};
use crate::time::Timestamp;
use crate::value::{Value, ValueKind};

/// Static declaration of a variable: name, kind, initial value and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    pub kind: ValueKind,
    pub initial: Value,
    pub unit: Option<String>,
    /// Decimal places every committed float is rounded to.
    pub precision: Option<u8>,
}

impl VariableSpec {
    /// Declare a floating-point variable.
    #[must_use]
    pub fn float(name: impl Into<String>, initial: f64) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Float,
            initial: Value::Float(initial),
            unit: None,
            precision: None,
        }
    }

    /// Declare a boolean variable.
    #[must_use]
    pub fn boolean(name: impl Into<String>, initial: bool) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Bool,
            initial: Value::Bool(initial),
            unit: None,
            precision: None,
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn precision(mut self, decimals: u8) -> Self {
        self.precision = Some(decimals);
        self
    }

    /// Check that `value` may be written to this variable.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::TypeMismatch`] when the kinds differ.
    pub fn accepts(&self, value: &Value) -> Result<(), FieldHubError> {
        if value.kind() != self.kind {
            return Err(TypeMismatchError {
                variable: self.name.clone(),
                expected: self.kind,
                actual: value.kind(),
            }
            .into());
        }
        Ok(())
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::Validation`] for an empty name and
    /// [`FieldHubError::TypeMismatch`] when the initial value has the wrong kind.
    pub fn validate(&self) -> Result<(), FieldHubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.accepts(&self.initial)
    }
}

/// A consistent `(value, version)` read of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    pub name: String,
    pub value: Value,
    pub version: u64,
    pub last_modified: Timestamp,
}

/// Cross-device address of a variable: `(device_name, variable_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableRef {
    pub device: String,
    pub variable: String,
}

impl VariableRef {
    #[must_use]
    pub fn new(device: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            variable: variable.into(),
        }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.device, self.variable)
    }
}
