//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for `last_modified`, notification and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Wall-clock `HH:MM:SS` rendering used by status and monitor lines.
#[must_use]
pub fn clock(ts: &Timestamp) -> String {
    ts.format("%H:%M:%S").to_string()
}
