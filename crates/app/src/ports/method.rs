//! Method port — server-side actions bound to a device.

use fieldhub_domain::error::FieldHubError;

use crate::registry::DeviceContext;

/// A zero-argument action invoked through a device method.
///
/// The action runs while the device's execution lock is held, so it never
/// interleaves with a simulation tick or another method call on the same
/// device. It returns the method's boolean outcome.
pub trait MethodAction: Send + Sync {
    /// Run the action against the locked device.
    ///
    /// # Errors
    ///
    /// Returns whatever the action's reads or writes fail with.
    fn invoke(&self, device: &DeviceContext<'_>) -> Result<bool, FieldHubError>;
}

impl<F> MethodAction for F
where
    F: Fn(&DeviceContext<'_>) -> Result<bool, FieldHubError> + Send + Sync,
{
    fn invoke(&self, device: &DeviceContext<'_>) -> Result<bool, FieldHubError> {
        self(device)
    }
}
