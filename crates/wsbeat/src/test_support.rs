//! Test-only fake transport.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedSender};
use futures::{Sink, Stream};
use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Observable side of a [`FakeSocket`]: what was written, how many write
/// attempts were made, and knobs controlling write outcomes.
pub(crate) struct FakeWire {
    sent: Mutex<Vec<Message>>,
    attempts: AtomicU32,
    /// Per-attempt outcomes, `true` = the write succeeds. Once drained,
    /// `default_outcome` applies.
    schedule: Mutex<VecDeque<bool>>,
    default_outcome: bool,
    stalled: AtomicBool,
}

impl FakeWire {
    /// Frames that were successfully written.
    pub(crate) fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    /// Total write attempts, successful or not.
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Make every subsequent write hang instead of completing.
    pub(crate) fn stall(&self) {
        self.stalled.store(true, Ordering::Relaxed);
    }
}

/// Scriptable in-memory transport. Inbound frames come from the returned
/// sender; outbound frames are recorded on the returned [`FakeWire`].
pub(crate) struct FakeSocket {
    incoming: mpsc::UnboundedReceiver<Result<Message, WsError>>,
    wire: Arc<FakeWire>,
}

type FakeParts = (
    FakeSocket,
    UnboundedSender<Result<Message, WsError>>,
    Arc<FakeWire>,
);

fn build(schedule: Vec<bool>, default_outcome: bool) -> FakeParts {
    let (tx, rx) = mpsc::unbounded();
    let wire = Arc::new(FakeWire {
        sent: Mutex::new(Vec::new()),
        attempts: AtomicU32::new(0),
        schedule: Mutex::new(schedule.into()),
        default_outcome,
        stalled: AtomicBool::new(false),
    });
    (
        FakeSocket {
            incoming: rx,
            wire: wire.clone(),
        },
        tx,
        wire,
    )
}

/// A transport whose writes all succeed.
pub(crate) fn healthy() -> FakeParts {
    build(Vec::new(), true)
}

/// A transport whose writes all fail.
pub(crate) fn broken() -> FakeParts {
    build(Vec::new(), false)
}

/// A transport following a per-attempt outcome script; writes fail once the
/// script is drained.
pub(crate) fn scripted(schedule: Vec<bool>) -> FakeParts {
    build(schedule, false)
}

impl Stream for FakeSocket {
    type Item = Result<Message, WsError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().incoming).poll_next(cx)
    }
}

impl Sink<Message> for FakeSocket {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        if self.wire.stalled.load(Ordering::Relaxed) {
            // Never wakes; callers are expected to bail out via timeout.
            Poll::Pending
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), WsError> {
        let wire = &self.get_mut().wire;
        let _ = wire.attempts.fetch_add(1, Ordering::Relaxed);
        let succeed = wire
            .schedule
            .lock()
            .pop_front()
            .unwrap_or(wire.default_outcome);
        if succeed {
            wire.sent.lock().push(item);
            Ok(())
        } else {
            Err(WsError::ConnectionClosed)
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }
}
