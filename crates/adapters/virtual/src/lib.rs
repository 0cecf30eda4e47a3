//! # fieldhub-adapter-virtual
//!
//! Virtual plant that provides simulated process units for demonstration and
//! testing.
//!
//! ## Provided devices
//!
//! | Variable | Kind | Initial | Unit | Precision |
//! |----------|------|---------|------|-----------|
//! | `Temperature` | float | 20.0 | °C | 2 |
//! | `Pressure` | float | 1.02 | bar | 3 |
//! | `Running` | bool | false | | |
//!
//! Each unit also exposes `ResetDevice`, which restores the initial values.
//! [`RandomWalk`] drifts temperature by ±0.5, pressure by ±0.01 and flips
//! `Running` on every simulation tick.
//!
//! ## Dependency rule
//!
//! Depends on `fieldhub-app` (port traits) and `fieldhub-domain` only.

mod devices;
mod random_walk;
mod status;

use fieldhub_app::ports::Integration;
use fieldhub_app::registry::DeviceRegistry;
use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::id::DeviceId;

pub use devices::{
    INITIAL_PRESSURE, INITIAL_TEMPERATURE, PRESSURE, RESET_DEVICE, RUNNING, TEMPERATURE,
    process_unit, reset_device,
};
pub use random_walk::{RandomWalk, Step};
pub use status::status_line;

/// Device names registered when none are configured.
pub const DEFAULT_DEVICES: [&str; 2] = ["Boiler_1", "Pump_2"];

/// Virtual integration that registers one process unit per configured name.
pub struct VirtualPlant {
    names: Vec<String>,
    devices: Vec<DeviceId>,
}

impl Default for VirtualPlant {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICES)
    }
}

impl VirtualPlant {
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            devices: Vec::new(),
        }
    }

    /// Names this plant registers, in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Check whether this integration registered the given device.
    #[must_use]
    pub fn owns_device(&self, id: DeviceId) -> bool {
        self.devices.contains(&id)
    }
}

impl Integration for VirtualPlant {
    fn name(&self) -> &'static str {
        "virtual"
    }

    async fn setup(&mut self, registry: &DeviceRegistry) -> Result<Vec<DeviceId>, FieldHubError> {
        for name in &self.names {
            let id = registry.add_device(process_unit(name))?;
            tracing::info!(device = %name, "added device");
            self.devices.push(id);
        }
        Ok(self.devices.clone())
    }

    async fn teardown(&mut self) -> Result<(), FieldHubError> {
        self.devices.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldhub_domain::value::Value;
    use fieldhub_domain::variable::VariableRef;

    #[tokio::test]
    async fn should_register_default_devices_on_setup() {
        let registry = DeviceRegistry::new();
        let mut plant = VirtualPlant::default();

        let ids = plant.setup(&registry).await.unwrap();

        assert_eq!(ids.len(), 2);
        let names: Vec<_> = registry.list_devices().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["Boiler_1", "Pump_2"]);
    }

    #[tokio::test]
    async fn should_return_virtual_as_name() {
        let plant = VirtualPlant::default();
        assert_eq!(plant.name(), "virtual");
    }

    #[tokio::test]
    async fn should_register_configured_names() {
        let registry = DeviceRegistry::new();
        let mut plant = VirtualPlant::new(["Mixer_3"]);

        plant.setup(&registry).await.unwrap();

        assert!(registry.find_device("Mixer_3").is_ok());
        assert!(registry.find_device("Boiler_1").is_err());
    }

    #[tokio::test]
    async fn should_fail_setup_on_duplicate_name() {
        let registry = DeviceRegistry::new();
        let mut plant = VirtualPlant::new(["Boiler_1", "Boiler_1"]);

        let result = plant.setup(&registry).await;

        assert!(matches!(result, Err(FieldHubError::DuplicateName(_))));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn should_own_registered_devices_until_teardown() {
        let registry = DeviceRegistry::new();
        let mut plant = VirtualPlant::default();
        let ids = plant.setup(&registry).await.unwrap();

        assert!(ids.iter().all(|id| plant.owns_device(*id)));
        assert!(!plant.owns_device(DeviceId::new()));

        plant.teardown().await.unwrap();
        assert!(!plant.owns_device(ids[0]));
    }

    #[tokio::test]
    async fn should_register_reset_device_method() {
        let registry = DeviceRegistry::new();
        let mut plant = VirtualPlant::default();
        plant.setup(&registry).await.unwrap();

        let pump = registry.find_device("Pump_2").unwrap();
        assert!(pump.has_method(RESET_DEVICE));
        assert_eq!(
            registry
                .read(&VariableRef::new("Pump_2", TEMPERATURE))
                .unwrap()
                .value,
            Value::Float(INITIAL_TEMPERATURE)
        );
    }
}
