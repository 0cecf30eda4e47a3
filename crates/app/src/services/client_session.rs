//! Client session — one client's view of the server.
//!
//! A session issues requests through the [`RequestGateway`] and owns the
//! subscriptions it creates. Disconnecting (or dropping) the session cancels
//! every subscription it still owns.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::id::{SessionId, SubscriptionId};
use fieldhub_domain::value::Value;
use fieldhub_domain::variable::{VariableRef, VariableSnapshot};

use crate::ports::{EventPublisher, NotificationSink};
use crate::services::request_gateway::{BrowseEntry, RequestGateway};
use crate::subscription_engine::{SubscriptionConfig, SubscriptionEngine};

pub struct ClientSession<EP> {
    id: SessionId,
    gateway: Arc<RequestGateway<EP>>,
    engine: Arc<SubscriptionEngine>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl<EP: EventPublisher> ClientSession<EP> {
    /// Open a session against a running server.
    pub fn connect(gateway: Arc<RequestGateway<EP>>, engine: Arc<SubscriptionEngine>) -> Self {
        let id = SessionId::new();
        tracing::info!(session_id = %id, "session opened");
        Self {
            id,
            gateway,
            engine,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// See [`RequestGateway::browse`].
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn browse(&self, device: Option<&str>) -> Result<Vec<BrowseEntry>, FieldHubError> {
        self.gateway.browse(device)
    }

    /// One monitoring pass: every variable of every device.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn poll(&self) -> Result<Vec<BrowseEntry>, FieldHubError> {
        let mut entries = self.gateway.browse(None)?;
        entries.retain(BrowseEntry::is_variable);
        Ok(entries)
    }

    /// See [`RequestGateway::read`].
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn read(&self, device: &str, variable: &str) -> Result<VariableSnapshot, FieldHubError> {
        self.gateway.read(device, variable)
    }

    /// See [`RequestGateway::write`].
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn write(
        &self,
        device: &str,
        variable: &str,
        value: impl Into<Value>,
    ) -> Result<u64, FieldHubError> {
        self.gateway.write(device, variable, value.into())
    }

    /// See [`RequestGateway::call`].
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub async fn call(&self, device: &str, method: &str) -> Result<bool, FieldHubError> {
        self.gateway.call(device, method).await
    }

    /// Register a subscription owned by this session.
    ///
    /// # Errors
    ///
    /// Propagates [`SubscriptionEngine::subscribe`] errors.
    pub async fn subscribe(
        &self,
        config: SubscriptionConfig,
        sink: impl NotificationSink + 'static,
    ) -> Result<SubscriptionId, FieldHubError> {
        let id = self.engine.subscribe(config, sink).await?;
        self.lock_subscriptions().push(id);
        Ok(id)
    }

    /// Subscribe to every variable of one device.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] for an unknown device, or
    /// propagates [`SubscriptionEngine::subscribe`] errors.
    pub async fn subscribe_to_device(
        &self,
        device: &str,
        interval: Duration,
        sink: impl NotificationSink + 'static,
    ) -> Result<SubscriptionId, FieldHubError> {
        let described = self.gateway.describe(device)?;
        let variables = described
            .variables
            .iter()
            .map(|spec| VariableRef::new(&described.name, &spec.name))
            .collect();
        self.subscribe(SubscriptionConfig::new(interval, variables), sink)
            .await
    }

    /// Cancel one subscription. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock_subscriptions().retain(|owned| *owned != id);
        self.engine.cancel(id);
    }

    /// Subscriptions this session still owns.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.lock_subscriptions().clone()
    }

    /// Close the session, cancelling its subscriptions.
    pub fn disconnect(self) {
        drop(self);
    }
}

impl<EP> ClientSession<EP> {
    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<SubscriptionId>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<EP> Drop for ClientSession<EP> {
    fn drop(&mut self) {
        let owned = std::mem::take(&mut *self.lock_subscriptions());
        for id in owned {
            self.engine.cancel(id);
        }
        tracing::info!(session_id = %self.id, "session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::registry::{DeviceBlueprint, DeviceRegistry};
    use crate::subscription_engine::SubscriptionState;
    use fieldhub_domain::variable::VariableSpec;
    use tokio::sync::mpsc;

    struct Fixture {
        gateway: Arc<RequestGateway<InProcessEventBus>>,
        engine: Arc<SubscriptionEngine>,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(DeviceRegistry::new());
            for name in ["Boiler_1", "Pump_2"] {
                registry
                    .add_device(
                        DeviceBlueprint::new(name)
                            .variable(VariableSpec::float("Temperature", 20.0).precision(2))
                            .variable(VariableSpec::boolean("Running", false)),
                    )
                    .unwrap();
            }
            Self {
                gateway: Arc::new(RequestGateway::new(
                    Arc::clone(&registry),
                    InProcessEventBus::new(16),
                )),
                engine: Arc::new(SubscriptionEngine::new(registry)),
            }
        }

        fn session(&self) -> ClientSession<InProcessEventBus> {
            ClientSession::connect(Arc::clone(&self.gateway), Arc::clone(&self.engine))
        }
    }

    #[test]
    fn should_poll_only_variables_of_all_devices() {
        let fx = Fixture::new();
        let session = fx.session();
        let entries = session.poll().unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(BrowseEntry::is_variable));
    }

    #[test]
    fn should_see_writes_from_other_sessions() {
        let fx = Fixture::new();
        let writer = fx.session();
        let reader = fx.session();
        assert_ne!(writer.id(), reader.id());

        writer.write("Pump_2", "Running", true).unwrap();
        let snap = reader.read("Pump_2", "Running").unwrap();
        assert_eq!(snap.value, Value::Bool(true));
    }

    #[tokio::test]
    async fn should_subscribe_to_every_variable_of_device() {
        let fx = Fixture::new();
        let session = fx.session();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = session
            .subscribe_to_device("Boiler_1", Duration::from_millis(500), tx)
            .await
            .unwrap();
        session.write("Boiler_1", "Temperature", 23.0).unwrap();
        session.write("Boiler_1", "Running", true).unwrap();
        session.write("Pump_2", "Running", true).unwrap();

        assert_eq!(fx.engine.sample_now(id).unwrap(), 2);
        assert_eq!(rx.recv().await.unwrap().variable, "Temperature");
        assert_eq!(rx.recv().await.unwrap().variable, "Running");
    }

    #[tokio::test]
    async fn should_fail_subscribing_to_unknown_device() {
        let fx = Fixture::new();
        let session = fx.session();
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = session
            .subscribe_to_device("Unknown", Duration::from_millis(500), tx)
            .await;
        assert!(matches!(result, Err(FieldHubError::NotFound(_))));
        assert!(session.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn should_cancel_owned_subscriptions_on_disconnect() {
        let fx = Fixture::new();
        let session = fx.session();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = session
            .subscribe_to_device("Pump_2", Duration::from_secs(1), tx)
            .await
            .unwrap();
        assert_eq!(fx.engine.state(id), SubscriptionState::Active);

        session.disconnect();

        assert_eq!(fx.engine.state(id), SubscriptionState::Cancelled);
        assert_eq!(fx.engine.active_count(), 0);
    }

    #[tokio::test]
    async fn should_unsubscribe_idempotently() {
        let fx = Fixture::new();
        let session = fx.session();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = session
            .subscribe_to_device("Pump_2", Duration::from_secs(1), tx)
            .await
            .unwrap();

        session.unsubscribe(id);
        session.unsubscribe(id);

        assert!(session.subscriptions().is_empty());
        assert_eq!(fx.engine.state(id), SubscriptionState::Cancelled);
    }
}
