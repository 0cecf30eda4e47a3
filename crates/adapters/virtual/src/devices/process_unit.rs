//! Process unit — temperature, pressure and running flag plus `ResetDevice`.

use fieldhub_app::registry::{DeviceBlueprint, DeviceContext};
use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::variable::VariableSpec;

pub const TEMPERATURE: &str = "Temperature";
pub const PRESSURE: &str = "Pressure";
pub const RUNNING: &str = "Running";
pub const RESET_DEVICE: &str = "ResetDevice";

pub const INITIAL_TEMPERATURE: f64 = 20.0;
pub const INITIAL_PRESSURE: f64 = 1.02;

/// Blueprint for one simulated process unit named `name`.
#[must_use]
pub fn process_unit(name: &str) -> DeviceBlueprint {
    DeviceBlueprint::new(name)
        .variable(
            VariableSpec::float(TEMPERATURE, INITIAL_TEMPERATURE)
                .unit("\u{b0}C")
                .precision(2),
        )
        .variable(
            VariableSpec::float(PRESSURE, INITIAL_PRESSURE)
                .unit("bar")
                .precision(3),
        )
        .variable(VariableSpec::boolean(RUNNING, false))
        .method(RESET_DEVICE, reset_device)
}

/// Restore a unit to its start-up state.
///
/// # Errors
///
/// Returns [`FieldHubError::NotFound`] if the device lacks one of the
/// process-unit variables.
pub fn reset_device(device: &DeviceContext<'_>) -> Result<bool, FieldHubError> {
    device.write(TEMPERATURE, INITIAL_TEMPERATURE)?;
    device.write(PRESSURE, INITIAL_PRESSURE)?;
    device.write(RUNNING, false)?;
    tracing::debug!(device = device.name(), "device reset");
    Ok(true)
}
