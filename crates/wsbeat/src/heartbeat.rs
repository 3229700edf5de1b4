//! Heartbeat ping liveness monitoring.

use std::sync::Weak;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::{Session, Transport};
use tokio_tungstenite::tungstenite::Message;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// Probe failures exceeded the configured threshold; the connection is
    /// presumed dead. The monitor does not close the session itself — the
    /// session is reaped when its next read or write fails.
    TimedOut,
    /// The monitor was cancelled, or the session was dropped.
    Cancelled,
}

/// Run heartbeat probes for a session until it dies or is cancelled.
///
/// Every `ping_period` a Ping frame with the configured payload goes through
/// the session's synchronized write path. A failed probe increments the
/// failure counter; once it exceeds `max_ping_failures` the monitor stops. A
/// successful probe decrements the counter (floored at zero), so recovering
/// from `f` failures takes `f` consecutive clean probes.
///
/// The counter is monitor-local state: nothing else reads or writes it. The
/// monitor holds only a [`Weak`] session reference, so an abandoned session
/// never keeps its monitor task alive.
pub(crate) async fn run_heartbeat<T: Transport>(
    session: Weak<Session<T>>,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let (period, payload, max_failures) = match session.upgrade() {
        Some(session) => {
            let cfg = session.config();
            (
                cfg.ping_period,
                cfg.ping_payload.clone(),
                cfg.max_ping_failures,
            )
        }
        None => return HeartbeatResult::Cancelled,
    };

    let mut ticker = time::interval(period);
    // The interval yields immediately; consume that tick so the first probe
    // fires one full period after start.
    let _ = ticker.tick().await;

    let mut failures: u32 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(session) = session.upgrade() else {
                    return HeartbeatResult::Cancelled;
                };
                match session.send_message(Message::Ping(payload.clone().into())).await {
                    Ok(()) => {
                        failures = failures.saturating_sub(1);
                        debug!(failures, "heartbeat probe sent");
                    }
                    Err(error) => {
                        failures += 1;
                        warn!(%error, failures, "heartbeat probe failed");
                        if failures > max_failures {
                            warn!(
                                failures,
                                max_failures,
                                "heartbeat failure threshold exceeded, monitor stopping"
                            );
                            return HeartbeatResult::TimedOut;
                        }
                    }
                }
            }
            () = cancel.cancelled() => {
                debug!("heartbeat cancelled");
                return HeartbeatResult::Cancelled;
            }
        }
    }
}
