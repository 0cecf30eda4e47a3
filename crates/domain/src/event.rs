//! Event — an immutable record of something that happened in the address space.
//!
//! Events are produced once per device per simulation tick and whenever a
//! method is invoked. They feed outward collaborators such as the status log.

use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::time::{Timestamp, now};
use crate::variable::VariableSnapshot;

/// A published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub kind: EventKind,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A device's variables after one simulation tick.
    DeviceStatus(DeviceStatus),
    /// A method ran to completion.
    MethodInvoked {
        device: String,
        method: String,
        outcome: bool,
    },
}

/// Snapshot of every variable of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device: String,
    pub variables: Vec<VariableSnapshot>,
}

impl DeviceStatus {
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&VariableSnapshot> {
        self.variables.iter().find(|v| v.name == variable)
    }
}

impl Event {
    /// Stamp a new event with a fresh id and the current time.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            timestamp: now(),
            kind,
        }
    }
}
