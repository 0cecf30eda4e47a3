//! Request gateway — read, write, call and browse against the registry.
//!
//! Every operation re-resolves its target by name, so callers never hold a
//! variable across two operations.

use std::fmt;
use std::sync::Arc;

use fieldhub_domain::device::Device;
use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::event::{Event, EventKind};
use fieldhub_domain::value::{Value, ValueKind};
use fieldhub_domain::variable::VariableSnapshot;

use crate::ports::EventPublisher;
use crate::registry::{DeviceKey, DeviceNode, DeviceRegistry};

/// One child of a device as seen by a browse.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseEntry {
    pub device: String,
    pub name: String,
    pub node: BrowseNode,
}

/// What a browsed child is.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowseNode {
    Variable {
        kind: ValueKind,
        value: Value,
        version: u64,
    },
    Method,
}

impl BrowseEntry {
    /// Current value, or `None` for a method.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        match self.node {
            BrowseNode::Variable { value, .. } => Some(value),
            BrowseNode::Method => None,
        }
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self.node, BrowseNode::Variable { .. })
    }
}

impl fmt::Display for BrowseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            BrowseNode::Variable { value, .. } => write!(f, "{}: {value}", self.name),
            BrowseNode::Method => write!(f, "{}: <not a variable>", self.name),
        }
    }
}

/// Serves external read/write/call/browse requests.
pub struct RequestGateway<EP> {
    registry: Arc<DeviceRegistry>,
    publisher: EP,
}

impl<EP: EventPublisher> RequestGateway<EP> {
    /// Create a gateway over the shared registry.
    pub fn new(registry: Arc<DeviceRegistry>, publisher: EP) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Describe one device.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] when the device is unknown.
    pub fn describe(&self, device: &str) -> Result<Device, FieldHubError> {
        self.registry.find_device(device)
    }

    /// Read a variable's current `(value, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] if the device or variable is
    /// unknown, or [`FieldHubError::TransientRead`] if the cell is unreadable.
    #[tracing::instrument(skip(self))]
    pub fn read(&self, device: &str, variable: &str) -> Result<VariableSnapshot, FieldHubError> {
        self.registry
            .node(DeviceKey::Name(device))?
            .variable(variable)?
            .snapshot()
    }

    /// Write a variable, returning its new version.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] if the device or variable is
    /// unknown, or [`FieldHubError::TypeMismatch`] if the value kind differs
    /// from the variable's kind. Nothing is mutated on error.
    #[tracing::instrument(skip(self))]
    pub fn write(&self, device: &str, variable: &str, value: Value) -> Result<u64, FieldHubError> {
        let version = self
            .registry
            .node(DeviceKey::Name(device))?
            .variable(variable)?
            .write(value)?;
        tracing::debug!(version, "variable written");
        Ok(version)
    }

    /// Invoke a device method under the device's execution lock.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] if the device or method is unknown,
    /// or whatever the bound action fails with.
    #[tracing::instrument(skip(self))]
    pub async fn call(&self, device: &str, method: &str) -> Result<bool, FieldHubError> {
        let node = self.registry.node(DeviceKey::Name(device))?;
        let action = node.method(method)?;
        let outcome = {
            let context = node.lock();
            action.invoke(&context)?
        };
        tracing::info!(outcome, "method executed");

        let event = Event::new(EventKind::MethodInvoked {
            device: node.name().to_string(),
            method: method.to_string(),
            outcome,
        });
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(error = %err, "failed to publish method event");
        }
        Ok(outcome)
    }

    /// List the children of one device, or of every device when `device` is
    /// `None`.
    ///
    /// Each variable is read atomically; different variables may come from
    /// different points in time.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] for an unknown device or
    /// [`FieldHubError::TransientRead`] if a cell is unreadable.
    pub fn browse(&self, device: Option<&str>) -> Result<Vec<BrowseEntry>, FieldHubError> {
        let nodes = match device {
            Some(name) => vec![self.registry.node(DeviceKey::Name(name))?],
            None => self.registry.nodes(),
        };
        let mut entries = Vec::new();
        for node in &nodes {
            browse_node(node, &mut entries)?;
        }
        Ok(entries)
    }
}

fn browse_node(node: &DeviceNode, entries: &mut Vec<BrowseEntry>) -> Result<(), FieldHubError> {
    for cell in node.variables() {
        let snap = cell.snapshot()?;
        entries.push(BrowseEntry {
            device: node.name().to_string(),
            name: snap.name,
            node: BrowseNode::Variable {
                kind: cell.spec().kind,
                value: snap.value,
                version: snap.version,
            },
        });
    }
    for method in node.method_names() {
        entries.push(BrowseEntry {
            device: node.name().to_string(),
            name: method.to_string(),
            node: BrowseNode::Method,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::registry::{DeviceBlueprint, DeviceContext};
    use fieldhub_domain::variable::VariableSpec;

    fn reset(device: &DeviceContext<'_>) -> Result<bool, FieldHubError> {
        device.write("Temperature", 20.0)?;
        device.write("Pressure", 1.02)?;
        device.write("Running", false)?;
        Ok(true)
    }

    fn boiler(name: &str) -> DeviceBlueprint {
        DeviceBlueprint::new(name)
            .variable(VariableSpec::float("Temperature", 20.0).precision(2))
            .variable(VariableSpec::float("Pressure", 1.02).precision(3))
            .variable(VariableSpec::boolean("Running", false))
            .method("ResetDevice", reset)
    }

    fn make_gateway() -> (RequestGateway<InProcessEventBus>, InProcessEventBus) {
        let registry = Arc::new(DeviceRegistry::new());
        registry.add_device(boiler("Boiler_1")).unwrap();
        registry.add_device(boiler("Pump_2")).unwrap();
        let bus = InProcessEventBus::new(16);
        (RequestGateway::new(registry, bus.clone()), bus)
    }

    #[test]
    fn should_read_written_value_with_next_version() {
        let (gw, _) = make_gateway();
        let before = gw.read("Boiler_1", "Temperature").unwrap();
        assert_eq!(before.value, Value::Float(20.0));

        let version = gw
            .write("Boiler_1", "Temperature", Value::Float(25.5))
            .unwrap();
        assert_eq!(version, before.version + 1);

        let after = gw.read("Boiler_1", "Temperature").unwrap();
        assert_eq!(after.value, Value::Float(25.5));
        assert_eq!(after.version, before.version + 1);
    }

    #[test]
    fn should_round_written_value_to_variable_precision() {
        let (gw, _) = make_gateway();
        gw.write("Pump_2", "Pressure", Value::Float(1.23456)).unwrap();
        let snap = gw.read("Pump_2", "Pressure").unwrap();
        assert_eq!(snap.value, Value::Float(1.235));
    }

    #[test]
    fn should_reject_bool_written_to_float_variable() {
        let (gw, _) = make_gateway();
        let before = gw.read("Boiler_1", "Temperature").unwrap();

        let result = gw.write("Boiler_1", "Temperature", Value::Bool(true));
        assert!(matches!(result, Err(FieldHubError::TypeMismatch(_))));

        let after = gw.read("Boiler_1", "Temperature").unwrap();
        assert_eq!(after.value, before.value);
        assert_eq!(after.version, before.version);
    }

    #[test]
    fn should_return_not_found_for_unknown_targets() {
        let (gw, _) = make_gateway();
        assert!(matches!(
            gw.read("Unknown", "Temperature"),
            Err(FieldHubError::NotFound(_))
        ));
        assert!(matches!(
            gw.read("Boiler_1", "Humidity"),
            Err(FieldHubError::NotFound(_))
        ));
        assert!(matches!(
            gw.write("Unknown", "Running", Value::Bool(true)),
            Err(FieldHubError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_reset_device_through_method_call() {
        let (gw, _) = make_gateway();
        gw.write("Pump_2", "Temperature", Value::Float(27.3)).unwrap();
        gw.write("Pump_2", "Pressure", Value::Float(1.10)).unwrap();
        gw.write("Pump_2", "Running", Value::Bool(true)).unwrap();

        let outcome = gw.call("Pump_2", "ResetDevice").await.unwrap();
        assert!(outcome);

        assert_eq!(
            gw.read("Pump_2", "Temperature").unwrap().value,
            Value::Float(20.0)
        );
        assert_eq!(
            gw.read("Pump_2", "Pressure").unwrap().value,
            Value::Float(1.02)
        );
        assert_eq!(
            gw.read("Pump_2", "Running").unwrap().value,
            Value::Bool(false)
        );
    }

    #[tokio::test]
    async fn should_publish_method_invoked_event() {
        let (gw, bus) = make_gateway();
        let mut rx = bus.subscribe();

        gw.call("Boiler_1", "ResetDevice").await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event.kind,
            EventKind::MethodInvoked {
                device: "Boiler_1".to_string(),
                method: "ResetDevice".to_string(),
                outcome: true,
            }
        );
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_method() {
        let (gw, _) = make_gateway();
        let result = gw.call("Boiler_1", "Explode").await;
        assert!(matches!(result, Err(FieldHubError::NotFound(_))));
    }

    #[test]
    fn should_browse_single_device_with_tagged_children() {
        let (gw, _) = make_gateway();
        let entries = gw.browse(Some("Boiler_1")).unwrap();

        let lines: Vec<_> = entries.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            [
                "Temperature: 20.0",
                "Pressure: 1.02",
                "Running: false",
                "ResetDevice: <not a variable>",
            ]
        );
        assert!(entries[0].is_variable());
        assert_eq!(entries[3].value(), None);
    }

    #[test]
    fn should_browse_all_devices_in_registry_order() {
        let (gw, _) = make_gateway();
        let entries = gw.browse(None).unwrap();
        assert_eq!(entries.len(), 8);
        assert_eq!(entries[0].device, "Boiler_1");
        assert_eq!(entries[4].device, "Pump_2");
    }

    #[test]
    fn should_keep_value_and_version_paired_under_concurrent_writes() {
        let (gw, _) = make_gateway();
        let gw = Arc::new(gw);
        let start = gw.read("Boiler_1", "Temperature").unwrap().version;

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let gw = Arc::clone(&gw);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let value = f64::from(i * 1000 + j);
                        gw.write("Boiler_1", "Temperature", Value::Float(value))
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let last = gw.read("Boiler_1", "Temperature").unwrap();
        assert_eq!(last.version, start + 400);
        let value = last.value.as_f64().unwrap();
        let written = (0..4).any(|i| (0..100).any(|j| f64::from(i * 1000 + j) == value));
        assert!(written);
    }
}
