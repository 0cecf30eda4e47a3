//! Notification — one delivered record describing a detected variable change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::SubscriptionId;
use crate::time::Timestamp;
use crate::value::Value;

/// Immutable change record handed to a subscription's sink exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub subscription_id: SubscriptionId,
    pub device: String,
    pub variable: String,
    pub value: Value,
    pub version: u64,
    /// Last-modified time of the sampled value.
    pub timestamp: Timestamp,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data change on {}.{}: new value = {} (v{})",
            self.device, self.variable, self.value, self.version
        )
    }
}
