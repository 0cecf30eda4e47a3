//! Built-in clients run by the daemon: status logger, polling monitor,
//! request/response demo and pub/sub listener.
//!
//! Long-running clients stop when their [`CancellationToken`] fires.

use std::sync::Arc;
use std::time::Duration;

use fieldhub_adapter_virtual::{PRESSURE, RESET_DEVICE, RUNNING, TEMPERATURE, status_line};
use fieldhub_app::event_bus::InProcessEventBus;
use fieldhub_app::ports::FnSink;
use fieldhub_app::services::client_session::ClientSession;
use fieldhub_domain::error::FieldHubError;
use fieldhub_domain::event::{Event, EventKind};
use fieldhub_domain::id::SubscriptionId;
use fieldhub_domain::notification::Notification;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;

pub type Session = ClientSession<InProcessEventBus>;

/// Log one status line per device per simulation tick, plus method events.
pub async fn status_logger(events: broadcast::Receiver<Event>, cancel: CancellationToken) {
    let mut stream = BroadcastStream::new(events);
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(event)) => log_event(&event),
            Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                tracing::warn!(skipped, "status logger lagged behind the event bus");
            }
            None => break,
        }
    }
    tracing::debug!("status logger stopped");
}

fn log_event(event: &Event) {
    match &event.kind {
        EventKind::DeviceStatus(status) => {
            tracing::info!("{}", status_line(status, &event.timestamp));
        }
        EventKind::MethodInvoked {
            device,
            method,
            outcome,
        } => {
            tracing::info!(%device, %method, outcome, "method invoked");
        }
    }
}

/// Poll every variable of every device once per `period`.
pub async fn monitor(session: Arc<Session>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(session_id = %session.id(), ?period, "monitor client connected");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        match session.poll() {
            Ok(entries) => {
                for entry in entries {
                    if let Some(value) = entry.value() {
                        tracing::info!(device = %entry.device, "{} -> {value}", entry.name);
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "monitor poll failed"),
        }
    }
    tracing::info!(session_id = %session.id(), "monitor client stopped");
}

/// Read a device's process values, then reset it.
///
/// # Errors
///
/// Returns the first failing read or call.
pub async fn request_demo(session: &Session, device: &str) -> Result<bool, FieldHubError> {
    log_browse(session, device)?;
    for variable in [TEMPERATURE, PRESSURE, RUNNING] {
        let snapshot = session.read(device, variable)?;
        tracing::info!(%device, "{variable}: {}", snapshot.value);
    }
    let outcome = session.call(device, RESET_DEVICE).await?;
    if outcome {
        tracing::info!(%device, "Method executed.");
    } else {
        tracing::warn!(%device, method = RESET_DEVICE, "method reported failure");
    }
    Ok(outcome)
}

/// Subscribe to every variable of `device`, logging each data change.
///
/// # Errors
///
/// Propagates subscription errors (unknown device, zero interval).
pub async fn listen(
    session: &Session,
    device: &str,
    interval: Duration,
) -> Result<SubscriptionId, FieldHubError> {
    log_browse(session, device)?;
    let id = session
        .subscribe_to_device(device, interval, FnSink(log_notification))
        .await?;
    tracing::info!(%device, subscription_id = %id, "listening for data changes");
    Ok(id)
}

/// `Found device: <name>` followed by one ` - <child>: <value>` line per child.
fn browse_lines(session: &Session, device: &str) -> Result<Vec<String>, FieldHubError> {
    let entries = session.browse(Some(device))?;
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("Found device: {device}"));
    lines.extend(entries.iter().map(|entry| format!(" - {entry}")));
    Ok(lines)
}

fn log_browse(session: &Session, device: &str) -> Result<(), FieldHubError> {
    for line in browse_lines(session, device)? {
        tracing::info!("{line}");
    }
    Ok(())
}

fn log_notification(notification: Notification) {
    tracing::info!("{notification}");
}
