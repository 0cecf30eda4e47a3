//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::event::Event;

use crate::ports::EventPublisher;

/// Fan-out of device status and method events to in-process listeners.
///
/// Publishing never fails: with no listener attached the event is dropped,
/// and a listener that falls more than `capacity` events behind skips the
/// oldest ones.
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), FieldHubError>> + Send {
        // broadcast::send fails only when there are zero receivers.
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(event_id = %event.id, "no listener for event");
        }
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldhub_domain::event::EventKind;

    fn invoked(device: &str) -> Event {
        Event::new(EventKind::MethodInvoked {
            device: device.to_string(),
            method: "ResetDevice".to_string(),
            outcome: true,
        })
    }

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        let event = invoked("Boiler_1");
        let event_id = event.id;

        bus.publish(event).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event_id);
    }

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = invoked("Pump_2");
        let event_id = event.id;

        bus.publish(event).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().id, event_id);
        assert_eq!(rx2.recv().await.unwrap().id, event_id);
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(16);
        let result = bus.publish(invoked("Boiler_1")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.publish(invoked("Boiler_1")).await.unwrap();

        let mut rx = bus.subscribe();

        let later = invoked("Pump_2");
        let later_id = later.id;
        bus.publish(later).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().id, later_id);
    }

    #[tokio::test]
    async fn should_skip_oldest_events_for_lagging_listener() {
        let bus = InProcessEventBus::new(2);
        let mut rx = bus.subscribe();

        for device in ["Boiler_1", "Pump_2", "Mixer_3"] {
            bus.publish(invoked(device)).await.unwrap();
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        let EventKind::MethodInvoked { device, .. } = rx.recv().await.unwrap().kind else {
            panic!("expected a method event");
        };
        assert_eq!(device, "Pump_2");
    }
}
