//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(20);
const DEFAULT_WRITE_DEADLINE: Duration = Duration::from_secs(35);
const DEFAULT_READ_DEADLINE: Duration = Duration::from_secs(30);
const DEFAULT_BUFFER_SIZE: usize = 20480;
const DEFAULT_MAX_PING_FAILURES: u32 = 4;

/// Configuration for one WebSocket session. Immutable after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wire buffer size in bytes, shared by the read and write side
    /// (default 20480).
    pub buffer_size: usize,
    /// Consecutive heartbeat probe failures tolerated before the monitor
    /// stops (default 4).
    pub max_ping_failures: u32,
    /// How long a single write may take before it is abandoned (default 35 s).
    pub write_deadline: Duration,
    /// Window within which the peer must show liveness; `Duration::ZERO`
    /// disables the read deadline entirely (default 30 s).
    pub read_deadline: Duration,
    /// Interval between heartbeat Ping probes (default 20 s).
    pub ping_period: Duration,
    /// Payload carried by each Ping probe (default empty).
    pub ping_payload: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_ping_failures: DEFAULT_MAX_PING_FAILURES,
            write_deadline: DEFAULT_WRITE_DEADLINE,
            read_deadline: DEFAULT_READ_DEADLINE,
            ping_period: DEFAULT_PING_PERIOD,
            ping_payload: String::new(),
        }
    }
}

impl SessionConfig {
    /// Start building a configuration. Every field left unset by the builder
    /// takes its documented default, independently of the others.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for [`SessionConfig`].
///
/// Setters may be applied in any order; the last write to a field wins, and
/// an explicitly set value is never overwritten by a default. Setting
/// `read_deadline` to zero is meaningful: it disables the read deadline.
#[derive(Clone, Debug, Default)]
pub struct SessionConfigBuilder {
    buffer_size: Option<usize>,
    max_ping_failures: Option<u32>,
    write_deadline: Option<Duration>,
    read_deadline: Option<Duration>,
    ping_period: Option<Duration>,
    ping_payload: Option<String>,
}

impl SessionConfigBuilder {
    /// Wire buffer size in bytes for both directions.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    /// Consecutive probe failures tolerated before the monitor stops.
    pub fn max_ping_failures(mut self, count: u32) -> Self {
        self.max_ping_failures = Some(count);
        self
    }

    /// Deadline for a single write.
    pub fn write_deadline(mut self, deadline: Duration) -> Self {
        self.write_deadline = Some(deadline);
        self
    }

    /// Read liveness window; `Duration::ZERO` disables it.
    pub fn read_deadline(mut self, deadline: Duration) -> Self {
        self.read_deadline = Some(deadline);
        self
    }

    /// Interval between heartbeat probes.
    pub fn ping_period(mut self, period: Duration) -> Self {
        self.ping_period = Some(period);
        self
    }

    /// Payload carried by each heartbeat probe.
    pub fn ping_payload(mut self, payload: impl Into<String>) -> Self {
        self.ping_payload = Some(payload.into());
        self
    }

    /// Resolve the configuration, filling unset fields with defaults.
    pub fn build(self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            buffer_size: self.buffer_size.unwrap_or(defaults.buffer_size),
            max_ping_failures: self
                .max_ping_failures
                .unwrap_or(defaults.max_ping_failures),
            write_deadline: self.write_deadline.unwrap_or(defaults.write_deadline),
            read_deadline: self.read_deadline.unwrap_or(defaults.read_deadline),
            ping_period: self.ping_period.unwrap_or(defaults.ping_period),
            ping_payload: self.ping_payload.unwrap_or(defaults.ping_payload),
        }
    }
}
