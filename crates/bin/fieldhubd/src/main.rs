//! # fieldhubd — fieldhub daemon
//!
//! Composition root that wires the address space, the simulation and the
//! built-in clients together and runs until Ctrl-C.
//!
//! ## Responsibilities
//! - Parse configuration (`fieldhub.toml`, env vars)
//! - Initialise `tracing`
//! - Populate the registry through the virtual plant integration
//! - Construct the gateway and subscription engine, injecting the event bus
//! - Start the simulation loop and the demo clients
//! - Shut down in order: clients, subscriptions, simulation, integration
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod clients;
mod config;

use std::sync::Arc;

use anyhow::Context;
use fieldhub_adapter_virtual::{RandomWalk, VirtualPlant};
use fieldhub_app::event_bus::InProcessEventBus;
use fieldhub_app::ports::Integration;
use fieldhub_app::registry::DeviceRegistry;
use fieldhub_app::services::client_session::ClientSession;
use fieldhub_app::services::request_gateway::RequestGateway;
use fieldhub_app::simulation::SimulationLoop;
use fieldhub_app::subscription_engine::SubscriptionEngine;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Address space
    let registry = Arc::new(DeviceRegistry::new());
    let mut plant = VirtualPlant::new(config.plant.devices.iter().cloned());
    let devices = plant
        .setup(&registry)
        .await
        .with_context(|| format!("setting up {} integration", plant.name()))?;
    tracing::info!(devices = devices.len(), "address space ready");

    // Event bus
    let event_bus = InProcessEventBus::new(256);
    let background = CancellationToken::new();
    let status_logger = tokio::spawn(clients::status_logger(
        event_bus.subscribe(),
        background.child_token(),
    ));

    // Services
    let gateway = Arc::new(RequestGateway::new(
        Arc::clone(&registry),
        event_bus.clone(),
    ));
    let engine = Arc::new(SubscriptionEngine::new(Arc::clone(&registry)));

    // Simulation
    let simulation = SimulationLoop::new(Arc::clone(&registry), RandomWalk::default(), event_bus)
        .with_period(config.tick_period())
        .start();

    // Clients
    let client_cancel = background.child_token();
    let mut client_tasks = JoinSet::new();

    if let Some(period) = config.monitor_period() {
        let session = Arc::new(ClientSession::connect(
            Arc::clone(&gateway),
            Arc::clone(&engine),
        ));
        client_tasks.spawn(clients::monitor(session, period, client_cancel.clone()));
    }

    if let Some(device) = &config.clients.request_device {
        let session = ClientSession::connect(Arc::clone(&gateway), Arc::clone(&engine));
        if let Err(err) = clients::request_demo(&session, device).await {
            tracing::warn!(%device, error = %err, "request/response client failed");
        }
        session.disconnect();
    }

    let listener = ClientSession::connect(Arc::clone(&gateway), Arc::clone(&engine));
    if let Some(device) = &config.clients.subscribe_device
        && let Err(err) = clients::listen(&listener, device, config.subscription_interval()).await
    {
        tracing::warn!(%device, error = %err, "pub/sub client failed");
    }

    tracing::info!("fieldhubd running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("shutdown requested");

    // Clients first, so nothing issues requests while the server winds down.
    client_cancel.cancel();
    while let Some(result) = client_tasks.join_next().await {
        if let Err(err) = result {
            tracing::error!(error = %err, "client task ended abnormally");
        }
    }
    listener.disconnect();

    engine.shutdown().await;
    simulation.shutdown().await;

    background.cancel();
    if let Err(err) = status_logger.await {
        tracing::error!(error = %err, "status logger ended abnormally");
    }

    plant
        .teardown()
        .await
        .with_context(|| format!("tearing down {} integration", plant.name()))?;
    tracing::info!("fieldhubd stopped");
    Ok(())
}
