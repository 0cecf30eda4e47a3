//! Notification sink port — where subscription changes are delivered.

use fieldhub_domain::error::DeliveryError;
use fieldhub_domain::notification::Notification;
use tokio::sync::mpsc;

/// Receives notifications produced by a subscription's sampling pass.
///
/// Delivery happens on the sampling task; implementations should hand the
/// notification off quickly. Errors (and panics) are logged by the engine
/// and never stop the subscription.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the notification could not be handed off.
    fn deliver(&self, notification: Notification) -> Result<(), DeliveryError>;
}

impl NotificationSink for mpsc::UnboundedSender<Notification> {
    fn deliver(&self, notification: Notification) -> Result<(), DeliveryError> {
        self.send(notification).map_err(|_| DeliveryError::Closed)
    }
}

/// Adapts a plain closure into a [`NotificationSink`].
pub struct FnSink<F>(pub F);

impl<F> NotificationSink for FnSink<F>
where
    F: Fn(Notification) + Send + Sync,
{
    fn deliver(&self, notification: Notification) -> Result<(), DeliveryError> {
        (self.0)(notification);
        Ok(())
    }
}
