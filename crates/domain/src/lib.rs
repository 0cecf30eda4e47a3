//! # fieldhub-domain
//!
//! Pure domain model for the fieldhub industrial information server.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Values** (typed float/bool payloads) and their rounding rules
//! - Define **Variables** (declarations, consistent snapshots, addresses)
//! - Define **Devices** (read-only descriptions of registered equipment)
//! - Define **Notifications** (subscription change records)
//! - Define **Events** (status and method-invocation records)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod event;
pub mod notification;
pub mod value;
pub mod variable;
