//! Session lifecycle — one upgraded connection from construction through
//! teardown.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{WebSocketStream, accept_async_with_config};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::handler::MessageHandler;
use crate::heartbeat::{HeartbeatResult, run_heartbeat};

/// The wire a session runs over: a bidirectional stream of WebSocket
/// messages. Satisfied by `WebSocketStream<S>` and by in-memory fakes in
/// tests.
pub trait Transport:
    Stream<Item = Result<Message, WsError>>
    + Sink<Message, Error = WsError>
    + Send
    + Unpin
    + 'static
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static
{
}

/// One upgraded connection plus its configuration and synchronization state.
///
/// The write half sits behind a lock: [`Session::send_message`] is the only
/// way to reach the wire, shared by application code and the heartbeat
/// monitor, so at most one write is in flight at any time. The read half is
/// consumed exactly once by [`Session::read_pump`]; the heartbeat task never
/// reads, so the read side needs no lock.
pub struct Session<T: Transport> {
    config: SessionConfig,
    writer: Mutex<SplitSink<T, Message>>,
    reader: Mutex<Option<SplitStream<T>>>,
    cancel: CancellationToken,
    monitor: parking_lot::Mutex<Option<JoinHandle<HeartbeatResult>>>,
}

impl<S> Session<WebSocketStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Perform the server side of the WebSocket handshake on `stream` and
    /// start a session over the upgraded connection.
    ///
    /// The configured buffer size feeds the wire's read and write buffers.
    /// No origin filtering happens here — callers that need origin
    /// restrictions enforce them at the HTTP layer before handing the
    /// stream over.
    ///
    /// # Errors
    ///
    /// [`SessionError::Upgrade`] if the exchange cannot be promoted to a
    /// WebSocket connection (missing upgrade headers, malformed request,
    /// I/O failure mid-handshake). No session is created in that case.
    pub async fn accept(stream: S, config: SessionConfig) -> Result<Arc<Self>, SessionError> {
        let ws_config = WebSocketConfig::default()
            .read_buffer_size(config.buffer_size)
            .write_buffer_size(config.buffer_size);
        let ws = accept_async_with_config(stream, Some(ws_config))
            .await
            .map_err(SessionError::Upgrade)?;
        info!("connection upgraded");
        Ok(Session::start(ws, config))
    }
}

impl<T: Transport> Session<T> {
    /// Start a session over an already-upgraded transport and spawn its
    /// heartbeat monitor.
    pub fn start(transport: T, config: SessionConfig) -> Arc<Self> {
        let session = Arc::new(Self::new(transport, config));
        session.spawn_monitor();
        session
    }

    /// Build the session without spawning the monitor. `start` and the
    /// heartbeat tests drive the monitor themselves.
    pub(crate) fn new(transport: T, config: SessionConfig) -> Self {
        let (writer, reader) = transport.split();
        Self {
            config,
            writer: Mutex::new(writer),
            reader: Mutex::new(Some(reader)),
            cancel: CancellationToken::new(),
            monitor: parking_lot::Mutex::new(None),
        }
    }

    /// The session's resolved configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn spawn_monitor(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        *self.monitor.lock() = Some(tokio::spawn(run_heartbeat(weak, cancel)));
    }

    pub(crate) fn take_monitor(&self) -> Option<JoinHandle<HeartbeatResult>> {
        self.monitor.lock().take()
    }

    /// Write one message frame to the connection.
    ///
    /// Blocks while another write is in progress; the write itself is
    /// bounded by the configured write deadline. A single attempt, first
    /// error wins — after a [`SessionError::WriteTimeout`] the connection
    /// may hold a partial frame and is not safe to write to again.
    pub async fn send_message(&self, message: Message) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().await;
        match time::timeout(self.config.write_deadline, writer.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(SessionError::Write(error)),
            Err(_) => Err(SessionError::WriteTimeout(self.config.write_deadline)),
        }
    }

    /// Run the inbound loop until the connection ends.
    ///
    /// Data frames go to `handler.on_message` in strict arrival order; the
    /// next frame is not read until the handler returns. Pongs are consumed
    /// to push the read deadline forward (or clear it when the configured
    /// deadline is zero) and are never surfaced. On any terminal condition —
    /// read error, deadline lapse, peer close, or a panic inside the
    /// handler — the heartbeat is cancelled and the handler sees exactly one
    /// `on_error` followed by `on_close`.
    ///
    /// Calling this a second time on the same session returns immediately.
    #[instrument(skip_all)]
    pub async fn read_pump(&self, handler: &dyn MessageHandler) {
        let reader = self.reader.lock().await.take();
        let Some(mut reader) = reader else {
            warn!("read_pump called on a session whose reader is already running");
            return;
        };

        let mut deadline = self.arm_read_deadline();
        let terminal = loop {
            let frame = match self.next_frame(&mut reader, deadline).await {
                Ok(Some(frame)) => frame,
                Ok(None) => break SessionError::Closed,
                Err(error) => break error,
            };

            match frame {
                frame @ (Message::Text(_) | Message::Binary(_)) => {
                    let dispatch = AssertUnwindSafe(handler.on_message(frame)).catch_unwind();
                    if let Err(panic) = dispatch.await {
                        break SessionError::HandlerPanic(panic_text(panic.as_ref()));
                    }
                }
                Message::Pong(_) => {
                    debug!("pong received, read deadline pushed forward");
                    deadline = self.arm_read_deadline();
                }
                Message::Ping(_) => {
                    // The protocol-level pong reply is queued by tungstenite.
                    debug!("ping received");
                }
                Message::Close(frame) => {
                    info!(?frame, "close frame received");
                    break SessionError::Closed;
                }
                Message::Frame(_) => {}
            }
        };

        match &terminal {
            SessionError::Closed => info!("read loop finished, connection closed"),
            error => warn!(%error, "read loop terminated"),
        }

        self.cancel.cancel();
        handler.on_error(&terminal).await;
        handler.on_close().await;
    }

    /// Tear the session down: stop the heartbeat, send a close frame, and
    /// wait for the monitor task to finish.
    pub async fn close(&self) {
        self.cancel.cancel();
        {
            let mut writer = self.writer.lock().await;
            let _ = time::timeout(self.config.write_deadline, writer.send(Message::Close(None)))
                .await;
        }
        let monitor = self.take_monitor();
        if let Some(handle) = monitor {
            let _ = handle.await;
        }
        info!("session closed");
    }

    fn arm_read_deadline(&self) -> Option<Instant> {
        let window = self.config.read_deadline;
        (window > Duration::ZERO).then(|| Instant::now() + window)
    }

    async fn next_frame(
        &self,
        reader: &mut SplitStream<T>,
        deadline: Option<Instant>,
    ) -> Result<Option<Message>, SessionError> {
        let next = match deadline {
            Some(at) => match time::timeout_at(at, reader.next()).await {
                Ok(next) => next,
                Err(_) => return Err(SessionError::ReadTimeout(self.config.read_deadline)),
            },
            None => reader.next().await,
        };
        match next {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => Err(SessionError::Read(error)),
            None => Ok(None),
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        // A discarded session must not leak its monitor task.
        self.cancel.cancel();
    }
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
