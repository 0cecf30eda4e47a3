//! Subscription engine — samples monitored variables and delivers changes.
//!
//! Each subscription owns a background task that wakes on its own interval
//! and runs one sampling pass: read every monitored variable atomically,
//! compare its version against the last one seen, and deliver a
//! [`Notification`] for each change. The baseline is taken at subscribe time,
//! so pre-existing values are never replayed.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use fieldhub_domain::error::{
    DeliveryError, FieldHubError, NotFoundError, TransientReadError, ValidationError,
};
use fieldhub_domain::id::SubscriptionId;
use fieldhub_domain::notification::Notification;
use fieldhub_domain::value::Value;
use fieldhub_domain::variable::VariableRef;

use crate::ports::NotificationSink;
use crate::registry::DeviceRegistry;

/// Options recognised when registering a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionConfig {
    /// Sampling period.
    pub interval: Duration,
    /// Monitored variables; delivery within a pass follows this order.
    pub variables: Vec<VariableRef>,
}

impl SubscriptionConfig {
    #[must_use]
    pub fn new(interval: Duration, variables: Vec<VariableRef>) -> Self {
        Self {
            interval,
            variables,
        }
    }

    fn validate(&self) -> Result<(), FieldHubError> {
        if self.interval.is_zero() {
            return Err(ValidationError::ZeroInterval.into());
        }
        if self.variables.is_empty() {
            return Err(ValidationError::NoVariables.into());
        }
        Ok(())
    }
}

/// Lifecycle of a subscription. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Cancelled,
}

struct MonitoredItem {
    target: VariableRef,
    last_value: Value,
    last_version: u64,
}

/// State shared between a subscription's entry and its sampling task.
struct Monitor {
    id: SubscriptionId,
    registry: Arc<DeviceRegistry>,
    /// Held for the whole pass, so passes never overlap.
    items: Mutex<Vec<MonitoredItem>>,
    sink: Box<dyn NotificationSink>,
}

impl Monitor {
    /// Run one sampling pass, returning how many notifications were delivered.
    fn sample(&self) -> usize {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;

        for item in items.iter_mut() {
            let snap = match self.registry.read(&item.target) {
                Ok(snap) => snap,
                Err(err) => {
                    let err = TransientReadError {
                        variable: item.target.to_string(),
                        reason: transient_reason(&err),
                    };
                    tracing::warn!(
                        subscription_id = %self.id,
                        error = %err,
                        "skipping variable for this pass"
                    );
                    continue;
                }
            };
            if snap.version == item.last_version {
                continue;
            }
            tracing::trace!(
                subscription_id = %self.id,
                variable = %item.target,
                previous = %item.last_value,
                "change detected"
            );

            // Advance the baseline first so a failing sink cannot cause a
            // second delivery of the same change.
            item.last_value = snap.value;
            item.last_version = snap.version;

            let notification = Notification {
                subscription_id: self.id,
                device: item.target.device.clone(),
                variable: item.target.variable.clone(),
                value: snap.value,
                version: snap.version,
                timestamp: snap.last_modified,
            };
            match self.deliver(notification) {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(
                    subscription_id = %self.id,
                    variable = %item.target,
                    error = %err,
                    "notification delivery failed"
                ),
            }
        }
        delivered
    }

    fn deliver(&self, notification: Notification) -> Result<(), FieldHubError> {
        catch_unwind(AssertUnwindSafe(|| self.sink.deliver(notification)))
            .unwrap_or(Err(DeliveryError::Panicked))
            .map_err(FieldHubError::from)
    }
}

fn transient_reason(err: &FieldHubError) -> &'static str {
    match err {
        FieldHubError::NotFound(_) => "variable no longer resolves",
        FieldHubError::TransientRead(inner) => inner.reason,
        _ => "read failed",
    }
}

struct Entry {
    monitor: Arc<Monitor>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns every active subscription.
pub struct SubscriptionEngine {
    registry: Arc<DeviceRegistry>,
    subscriptions: Mutex<HashMap<SubscriptionId, Entry>>,
    cancel: CancellationToken,
}

impl SubscriptionEngine {
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self {
            registry,
            subscriptions: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Register a subscription and start its sampling task.
    ///
    /// The current `(value, version)` of every monitored variable becomes the
    /// baseline; only later changes are delivered.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::Validation`] for a zero interval, an empty
    /// variable set or an engine that has been shut down, and
    /// [`FieldHubError::NotFound`] if a variable does not resolve.
    #[tracing::instrument(skip(self, config, sink), fields(interval = ?config.interval))]
    pub async fn subscribe(
        &self,
        config: SubscriptionConfig,
        sink: impl NotificationSink + 'static,
    ) -> Result<SubscriptionId, FieldHubError> {
        config.validate()?;

        let mut items = Vec::with_capacity(config.variables.len());
        for target in config.variables {
            let snap = self.registry.read(&target)?;
            items.push(MonitoredItem {
                target,
                last_value: snap.value,
                last_version: snap.version,
            });
        }

        let id = SubscriptionId::new();
        let monitor = Arc::new(Monitor {
            id,
            registry: Arc::clone(&self.registry),
            items: Mutex::new(items),
            sink: Box::new(sink),
        });
        let mut subscriptions = self.lock_subscriptions();
        // Checked under the lock: `shutdown` drains under the same lock.
        if self.cancel.is_cancelled() {
            return Err(ValidationError::EngineStopped.into());
        }
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(sampling_task(
            Arc::clone(&monitor),
            config.interval,
            cancel.clone(),
        ));
        subscriptions.insert(
            id,
            Entry {
                monitor,
                cancel,
                handle,
            },
        );
        drop(subscriptions);
        tracing::info!(subscription_id = %id, "subscription created");
        Ok(id)
    }

    /// Cancel a subscription. Unknown or already-cancelled ids are a no-op.
    ///
    /// A pass already in progress runs to completion; no further pass starts.
    pub fn cancel(&self, id: SubscriptionId) {
        let Some(entry) = self.lock_subscriptions().remove(&id) else {
            tracing::debug!(subscription_id = %id, "cancel ignored, not active");
            return;
        };
        entry.cancel.cancel();
        tracing::info!(subscription_id = %id, "subscription cancelled");
    }

    #[must_use]
    pub fn state(&self, id: SubscriptionId) -> SubscriptionState {
        if self.lock_subscriptions().contains_key(&id) {
            SubscriptionState::Active
        } else {
            SubscriptionState::Cancelled
        }
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock_subscriptions().len()
    }

    /// Run one sampling pass immediately, outside the subscription's schedule.
    ///
    /// # Errors
    ///
    /// Returns [`FieldHubError::NotFound`] if the subscription is not active.
    pub fn sample_now(&self, id: SubscriptionId) -> Result<usize, FieldHubError> {
        let monitor = self
            .lock_subscriptions()
            .get(&id)
            .map(|entry| Arc::clone(&entry.monitor))
            .ok_or_else(|| NotFoundError {
                entity: "Subscription",
                id: id.to_string(),
            })?;
        Ok(monitor.sample())
    }

    /// Cancel every subscription and wait for in-flight passes to finish.
    ///
    /// Terminal: later calls to [`subscribe`](Self::subscribe) fail.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let entries: Vec<_> = self
            .lock_subscriptions()
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in entries {
            if let Err(err) = entry.handle.await {
                tracing::error!(error = %err, "sampling task ended abnormally");
            }
        }
        tracing::info!("subscription engine stopped");
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, Entry>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn sampling_task(monitor: Arc<Monitor>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let delivered = monitor.sample();
                tracing::trace!(subscription_id = %monitor.id, delivered, "sampling pass done");
            }
        }
    }
}
