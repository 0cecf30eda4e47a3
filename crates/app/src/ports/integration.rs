//! Integration port — lifecycle for device providers.
//!
//! An integration populates the address space with the devices it owns at
//! start-up and releases its resources on shutdown.

use std::future::Future;

use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::id::DeviceId;

use crate::registry::DeviceRegistry;

/// A pluggable device integration.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup) — register devices in the registry
/// 2. (the server runs)
/// 3. [`teardown`](Self::teardown) — clean up resources
pub trait Integration {
    /// Unique name identifying this integration (e.g. `"virtual"`).
    fn name(&self) -> &'static str;

    /// Register this integration's devices, returning their ids in order.
    fn setup(
        &mut self,
        registry: &DeviceRegistry,
    ) -> impl Future<Output = Result<Vec<DeviceId>, FieldHubError>> + Send;

    /// Called on graceful shutdown.
    fn teardown(&mut self) -> impl Future<Output = Result<(), FieldHubError>> + Send;
}
