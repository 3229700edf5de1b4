//! Application-facing dispatch contract.

use async_trait::async_trait;
use tokio_tungstenite::tungstenite::Message;

use crate::error::SessionError;

/// Receives everything a session produces.
///
/// All callbacks for one session run on the session's read task: they are
/// never invoked concurrently with each other, and the next frame is not
/// read until `on_message` returns (back-pressure is implicit).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Called once per received data frame, in strict arrival order.
    /// Control frames (ping, pong, close) are never surfaced here.
    async fn on_message(&self, message: Message);

    /// Called once when the read loop terminates: a read error, a read
    /// deadline lapse, a peer close, or a panic while dispatching.
    async fn on_error(&self, error: &SessionError);

    /// Called after `on_error`, once the connection is torn down. Always
    /// fires when the read loop exits, regardless of the cause.
    async fn on_close(&self);
}
