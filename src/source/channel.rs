//! Channel-based data source.
//!
//! Receives source events via a tokio unbounded channel. Useful when the
//! snapshots are produced in-process, and for driving the app in tests.

use tokio::sync::mpsc;

use super::{ConnectionState, DataSource, Snapshot, SourceEvent};

/// A data source fed by an in-memory channel.
///
/// # Example
///
/// ```
/// use hostwatch::source::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("in-process");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::UnboundedReceiver<SourceEvent>,
    description: String,
    closed: bool,
}

/// Producer half of a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct ChannelSender {
    sender: mpsc::UnboundedSender<SourceEvent>,
}

impl ChannelSender {
    /// Push a snapshot. Returns `false` if the source was dropped.
    pub fn send_snapshot(&self, snapshot: Snapshot) -> bool {
        self.send(SourceEvent::Snapshot(Box::new(snapshot)))
    }

    /// Report a connection state change.
    pub fn send_state(&self, state: ConnectionState) -> bool {
        self.send(SourceEvent::State(state))
    }

    pub fn send(&self, event: SourceEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

impl ChannelSource {
    /// Create a sender/source pair.
    pub fn create(source_description: &str) -> (ChannelSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            receiver: rx,
            description: format!("channel: {}", source_description),
            closed: false,
        };
        (ChannelSender { sender: tx }, source)
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Option<SourceEvent> {
        if self.closed {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                Some(SourceEvent::State(ConnectionState::Disconnected))
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn shutdown(&mut self) {
        self.receiver.close();
        self.closed = true;
    }
}
