//! # fieldhub-app
//!
//! Application layer — the address space, its mutation and notification
//! engine, and the **port definitions** (traits) adapters implement.
//!
//! ## Responsibilities
//! - Own the shared address space (`DeviceRegistry`) and its atomic
//!   variable read/write primitive
//! - Define **port traits** adapters must implement:
//!   - `Perturbation` — the simulation rule applied every tick
//!   - `MethodAction` — server-side actions bound to device methods
//!   - `NotificationSink` — where subscription changes are delivered
//!   - `EventPublisher` — outbound status and method events
//!   - `Integration` — device provider lifecycle
//! - Provide the use-case surface:
//!   - `RequestGateway` — read, write, call, browse
//!   - `ClientSession` — one client's requests and subscriptions
//!   - `SubscriptionEngine` — interval sampling and change delivery
//!   - `SimulationLoop` — periodic, cancellable perturbation of every device
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `fieldhub-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod registry;
pub mod services;
pub mod simulation;
pub mod subscription_engine;
