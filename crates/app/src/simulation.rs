//! Simulation loop — periodically perturbs every device's variables.
//!
//! Each tick walks the registry in insertion order. A device is perturbed
//! while its execution lock is held, so a method call never observes a
//! half-applied tick. After each device a [`DeviceStatus`] event is published.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::event::{DeviceStatus, Event, EventKind};

use crate::ports::{EventPublisher, Perturbation};
use crate::registry::{DeviceContext, DeviceRegistry};

/// Tick period used when none is configured.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(2);

/// Drives the [`Perturbation`] rule over the whole registry.
pub struct SimulationLoop<P, EP> {
    registry: Arc<DeviceRegistry>,
    perturbation: P,
    publisher: EP,
    period: Duration,
}

impl<P, EP> SimulationLoop<P, EP>
where
    P: Perturbation,
    EP: EventPublisher + Send + Sync,
{
    pub fn new(registry: Arc<DeviceRegistry>, perturbation: P, publisher: EP) -> Self {
        Self {
            registry,
            perturbation,
            publisher,
            period: DEFAULT_TICK_PERIOD,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one tick over every device.
    ///
    /// Returns the status of each device that was updated. A device whose
    /// update fails is logged and skipped; the tick carries on.
    pub async fn tick(&self) -> Vec<DeviceStatus> {
        let mut statuses = Vec::new();
        for node in self.registry.nodes() {
            let result = {
                let device = node.lock();
                self.perturb(&device)
            };
            match result {
                Ok(status) => {
                    let event = Event::new(EventKind::DeviceStatus(status.clone()));
                    if let Err(err) = self.publisher.publish(event).await {
                        tracing::warn!(device = node.name(), error = %err, "failed to publish status");
                    }
                    statuses.push(status);
                }
                Err(err) => {
                    tracing::warn!(device = node.name(), error = %err, "simulation update failed");
                }
            }
        }
        statuses
    }

    fn perturb(&self, device: &DeviceContext<'_>) -> Result<DeviceStatus, FieldHubError> {
        let specs: Vec<_> = device.variables().cloned().collect();
        for spec in &specs {
            let current = device.read(&spec.name)?;
            if let Some(next) = self.perturbation.next_value(spec, current.value) {
                device.write(&spec.name, next)?;
            }
        }
        device.status()
    }
}

impl<P, EP> SimulationLoop<P, EP>
where
    P: Perturbation + 'static,
    EP: EventPublisher + Send + Sync + 'static,
{
    /// Spawn the loop on the current runtime. The first tick runs immediately.
    #[must_use]
    pub fn start(self) -> SimulationHandle {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(self, cancel.clone()));
        SimulationHandle { cancel, handle }
    }
}

async fn run<P, EP>(simulation: SimulationLoop<P, EP>, cancel: CancellationToken)
where
    P: Perturbation,
    EP: EventPublisher + Send + Sync,
{
    let mut interval = tokio::time::interval(simulation.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(period = ?simulation.period, "simulation started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        // Outside the select: a tick that has begun is never interrupted.
        let statuses = simulation.tick().await;
        tracing::debug!(devices = statuses.len(), "simulation tick done");
    }
    tracing::info!("simulation stopped");
}

/// Controls a running [`SimulationLoop`].
pub struct SimulationHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SimulationHandle {
    /// Stop scheduling ticks without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop scheduling ticks and wait for the in-flight tick to complete.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            tracing::error!(error = %err, "simulation task ended abnormally");
        }
    }
}
