//! # wsbeat
//!
//! Per-connection `WebSocket` session management.
//!
//! - `Session`: owns one upgraded connection; `send_message` is the single
//!   synchronized gateway to the write side, `read_pump` the sequential
//!   inbound loop dispatching to a [`MessageHandler`]
//! - Heartbeat monitor: periodic Ping probes with a consecutive-failure
//!   threshold, started automatically when the session is constructed
//! - Read liveness: pongs from the peer push the read deadline forward; a
//!   silent peer fails the read loop after one full deadline window
//! - Teardown via `CancellationToken` (explicit `close`, end of `read_pump`,
//!   or drop of the last session handle)

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handler;
pub mod heartbeat;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use error::SessionError;
pub use handler::MessageHandler;
pub use heartbeat::HeartbeatResult;
pub use session::{Session, Transport};

pub use tokio_tungstenite::tungstenite::Message;
