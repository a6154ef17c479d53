//! Connection lifecycle and reconnect scheduling.
//!
//! [`ConnectionManager`] is the bookkeeping half of the live source: it owns
//! the [`ConnectionState`] and the single reconnect deadline, and is driven by
//! the I/O loop in [`super::live`]. Keeping it free of sockets and timers lets
//! the reconnect rules be checked with plain `Instant` arithmetic.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──opened──▶ Connected
//!      ▲                        │                     │
//!      └────────closed──────────┴──────closed─────────┘
//!      │
//!      └──poll_reconnect (deadline elapsed)──▶ Connecting
//! ```

use std::time::{Duration, Instant};

/// Default delay between a session ending and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// State of the streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Returns the display label for this state.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

/// Session state machine with a fixed-delay, single-timer reconnect policy.
///
/// The manager never gives up on its own: every close schedules another
/// attempt. Only [`shutdown`](Self::shutdown) stops it for good.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    state: ConnectionState,
    reconnect_delay: Duration,
    reconnect_at: Option<Instant>,
    attempts: u64,
    shut_down: bool,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state.
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_delay,
            reconnect_at: None,
            attempts: 0,
            shut_down: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connected indicator should be lit.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// The pending reconnect deadline, if one is scheduled.
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Total number of connect attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Begin a connect attempt.
    ///
    /// Only valid from `Disconnected`. Returns `false` (and does nothing) when
    /// a session is already in progress or the manager has been shut down.
    /// A successful call consumes any pending reconnect deadline.
    pub fn connect(&mut self) -> bool {
        if self.shut_down || self.state != ConnectionState::Disconnected {
            return false;
        }
        self.reconnect_at = None;
        self.state = ConnectionState::Connecting;
        self.attempts += 1;
        true
    }

    /// The transport finished its handshake.
    pub fn opened(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
        }
    }

    /// The session ended (remote close, transport error, or malformed frame).
    ///
    /// Moves to `Disconnected` and schedules one reconnect `reconnect_delay`
    /// after `now`, unless a reconnect is already pending, in which case the
    /// existing deadline is kept. Returns the deadline in effect, or `None`
    /// after shutdown.
    pub fn closed(&mut self, now: Instant) -> Option<Instant> {
        self.state = ConnectionState::Disconnected;
        if self.shut_down {
            return None;
        }
        let deadline = *self.reconnect_at.get_or_insert(now + self.reconnect_delay);
        Some(deadline)
    }

    /// Fire the reconnect timer if its deadline has passed.
    ///
    /// Returns `true` when a new connect attempt was started.
    pub fn poll_reconnect(&mut self, now: Instant) -> bool {
        match self.reconnect_at {
            Some(deadline) if now >= deadline => self.connect(),
            _ => false,
        }
    }

    /// Disconnect for good: cancel any pending reconnect and refuse further
    /// attempts.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        self.reconnect_at = None;
        self.state = ConnectionState::Disconnected;
    }
}
