//! Session error types.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Errors raised by a session, its read loop, or its heartbeat monitor.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The HTTP exchange could not be promoted to a WebSocket connection.
    /// Fatal at construction time; no session is created.
    #[error("websocket upgrade failed: {0}")]
    Upgrade(#[source] WsError),

    /// Reading a frame failed. Terminal for the session.
    #[error("read failed: {0}")]
    Read(#[source] WsError),

    /// No inbound frame arrived within the read deadline window.
    #[error("no data received within the read deadline ({0:?})")]
    ReadTimeout(Duration),

    /// Writing a frame failed. Returned to the `send_message` caller; the
    /// heartbeat monitor counts it against the failure threshold instead of
    /// terminating the session.
    #[error("write failed: {0}")]
    Write(#[source] WsError),

    /// The write did not complete within the write deadline. The connection
    /// is not safe to retry on: the frame may have been partially written.
    #[error("write did not complete within the deadline ({0:?})")]
    WriteTimeout(Duration),

    /// The peer closed the connection (close frame or end of stream).
    #[error("connection closed by peer")]
    Closed,

    /// The message handler panicked while dispatching a frame.
    #[error("message handler panicked: {0}")]
    HandlerPanic(String),
}
