//! One-line rendering of a process unit's status.

use fieldhub_domain::event::DeviceStatus;
use fieldhub_domain::time::{Timestamp, clock};

use crate::devices::{PRESSURE, RUNNING, TEMPERATURE};

/// `<HH:MM:SS> <device> -> T=<t> °C, P=<p> bar, Running=<bool>`.
///
/// A variable missing from `status` renders as `?`.
#[must_use]
pub fn status_line(status: &DeviceStatus, at: &Timestamp) -> String {
    let field = |name: &str| {
        status
            .get(name)
            .map_or_else(|| "?".to_string(), |snapshot| snapshot.value.to_string())
    };
    format!(
        "{} {} -> T={} \u{b0}C, P={} bar, Running={}",
        clock(at),
        status.device,
        field(TEMPERATURE),
        field(PRESSURE),
        field(RUNNING),
    )
}
