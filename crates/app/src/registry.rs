//! Device registry — the address space every other component shares.
//!
//! The registry exclusively owns all devices and their variable cells. It is
//! constructed once at start-up and handed to the gateway, the simulation
//! loop and the subscription engine behind an `Arc`.

mod cell;
mod node;

pub use node::{DeviceBlueprint, DeviceContext};

pub(crate) use node::DeviceNode;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use fieldhub_domain::device::Device;
use fieldhub_domain::error::{DuplicateNameError, FieldHubError, NotFoundError};
use fieldhub_domain::id::DeviceId;
use fieldhub_domain::variable::{VariableRef, VariableSnapshot};

/// Lookup key accepted by [`DeviceRegistry::find_device`].
#[derive(Debug, Clone, Copy)]
pub enum DeviceKey<'a> {
    Name(&'a str),
    Id(DeviceId),
}

impl<'a> From<&'a str> for DeviceKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for DeviceKey<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl From<DeviceId> for DeviceKey<'_> {
    fn from(id: DeviceId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for DeviceKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => id.fmt(f),
        }
    }
}

/// Owns every device, in insertion order.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<Arc<DeviceNode>>>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and assign it a stable id.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::DuplicateName`] if a device with the same name
    /// exists, or [`FieldHubError::Validation`] if the blueprint is invalid.
    /// The registry is unchanged on error.
    #[tracing::instrument(skip(self, blueprint), fields(device_name = %blueprint.name()))]
    pub fn add_device(&self, blueprint: DeviceBlueprint) -> Result<DeviceId, FieldHubError> {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        if devices.iter().any(|d| d.name() == blueprint.name()) {
            return Err(DuplicateNameError {
                entity: "Device",
                name: blueprint.name().to_string(),
            }
            .into());
        }
        let node = blueprint.build(DeviceId::new())?;
        let id = node.id();
        devices.push(Arc::new(node));
        tracing::info!(device_id = %id, "device added");
        Ok(id)
    }

    /// Describe a device by name or id.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] when no such device exists.
    pub fn find_device<'a>(&self, key: impl Into<DeviceKey<'a>>) -> Result<Device, FieldHubError> {
        self.node(key.into()).map(|node| node.describe())
    }

    /// Describe every device in insertion order.
    #[must_use]
    pub fn list_devices(&self) -> Vec<Device> {
        self.nodes().iter().map(|node| node.describe()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a variable address and read it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] if the device or variable is
    /// unknown, or [`FieldHubError::TransientRead`] if the cell is unreadable.
    pub fn read(&self, target: &VariableRef) -> Result<VariableSnapshot, FieldHubError> {
        self.node(DeviceKey::Name(&target.device))?
            .variable(&target.variable)?
            .snapshot()
    }

    pub(crate) fn node(&self, key: DeviceKey<'_>) -> Result<Arc<DeviceNode>, FieldHubError> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        let found = match key {
            DeviceKey::Name(name) => devices.iter().find(|d| d.name() == name),
            DeviceKey::Id(id) => devices.iter().find(|d| d.id() == id),
        };
        found.cloned().ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: key.to_string(),
            }
            .into()
        })
    }

    /// Handles to every device, in insertion order.
    pub(crate) fn nodes(&self) -> Vec<Arc<DeviceNode>> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
