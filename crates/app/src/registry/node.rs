//! Live device nodes and the blueprints they are built from.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fieldhub_domain::device::Device;
use fieldhub_domain::error::{FieldHubError, NotFoundError, ValidationError};
use fieldhub_domain::event::DeviceStatus;
use fieldhub_domain::id::DeviceId;
use fieldhub_domain::value::Value;
use fieldhub_domain::variable::{VariableSnapshot, VariableSpec};

use super::cell::VariableCell;
use crate::ports::MethodAction;

/// Everything needed to register a device: its name, variables and methods.
///
/// Children are fixed once the device is registered.
pub struct DeviceBlueprint {
    name: String,
    variables: Vec<VariableSpec>,
    methods: Vec<(String, Arc<dyn MethodAction>)>,
}

impl DeviceBlueprint {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a variable; declaration order is browse order.
    #[must_use]
    pub fn variable(mut self, spec: VariableSpec) -> Self {
        self.variables.push(spec);
        self
    }

    /// Bind a zero-argument method.
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, action: impl MethodAction + 'static) -> Self {
        let action: Arc<dyn MethodAction> = Arc::new(action);
        self.methods.push((name.into(), action));
        self
    }

    fn validate(&self) -> Result<(), FieldHubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let mut seen = HashSet::new();
        for spec in &self.variables {
            spec.validate()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(ValidationError::DuplicateChild(spec.name.clone()).into());
            }
        }
        for (name, _) in &self.methods {
            if name.is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            if !seen.insert(name.as_str()) {
                return Err(ValidationError::DuplicateChild(name.clone()).into());
            }
        }
        Ok(())
    }

    pub(crate) fn build(self, id: DeviceId) -> Result<DeviceNode, FieldHubError> {
        self.validate()?;
        Ok(DeviceNode {
            id,
            name: self.name,
            variables: self.variables.into_iter().map(VariableCell::new).collect(),
            methods: self.methods,
            exec: Mutex::new(()),
        })
    }
}

/// A registered device with its live variable cells.
pub(crate) struct DeviceNode {
    id: DeviceId,
    name: String,
    variables: Vec<VariableCell>,
    methods: Vec<(String, Arc<dyn MethodAction>)>,
    /// Serialises method calls and simulation ticks on this device.
    exec: Mutex<()>,
}

impl DeviceNode {
    pub(crate) fn id(&self) -> DeviceId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn variables(&self) -> &[VariableCell] {
        &self.variables
    }

    pub(crate) fn variable(&self, name: &str) -> Result<&VariableCell, FieldHubError> {
        self.variables
            .iter()
            .find(|cell| cell.name() == name)
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Variable",
                    id: format!("{}.{name}", self.name),
                }
                .into()
            })
    }

    pub(crate) fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn method(&self, name: &str) -> Result<Arc<dyn MethodAction>, FieldHubError> {
        self.methods
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, action)| Arc::clone(action))
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Method",
                    id: format!("{}.{name}", self.name),
                }
                .into()
            })
    }

    /// Take the device's execution lock.
    pub(crate) fn lock(&self) -> DeviceContext<'_> {
        DeviceContext {
            node: self,
            _guard: self.exec.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub(crate) fn describe(&self) -> Device {
        Device {
            id: self.id,
            name: self.name.clone(),
            variables: self.variables.iter().map(|c| c.spec().clone()).collect(),
            methods: self.method_names().map(str::to_string).collect(),
        }
    }
}

/// Exclusive access to one device for the duration of a method call or a
/// simulation tick.
///
/// Reads and writes go through the same atomic primitive as the request
/// gateway, so version bookkeeping stays uniform.
pub struct DeviceContext<'a> {
    node: &'a DeviceNode,
    _guard: MutexGuard<'a, ()>,
}

impl DeviceContext<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Declarations of the device's variables, in order.
    pub fn variables(&self) -> impl Iterator<Item = &VariableSpec> {
        self.node.variables().iter().map(VariableCell::spec)
    }

    /// Read one variable of this device.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] for an unknown variable or
    /// [`FieldHubError::TransientRead`] if the cell is unreadable.
    pub fn read(&self, variable: &str) -> Result<VariableSnapshot, FieldHubError> {
        self.node.variable(variable)?.snapshot()
    }

    /// Write one variable of this device, returning the new version.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] for an unknown variable or
    /// [`FieldHubError::TypeMismatch`] when the value kind is wrong.
    pub fn write(&self, variable: &str, value: impl Into<Value>) -> Result<u64, FieldHubError> {
        self.node.variable(variable)?.write(value.into())
    }

    /// Snapshot every variable of the device.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::TransientRead`] if any cell is unreadable.
    pub fn status(&self) -> Result<DeviceStatus, FieldHubError> {
        let variables = self
            .node
            .variables()
            .iter()
            .map(VariableCell::snapshot)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DeviceStatus {
            device: self.node.name().to_string(),
            variables,
        })
    }
}
