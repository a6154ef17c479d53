//! Data source abstraction for receiving metric snapshots.
//!
//! This module provides a trait-based abstraction over where snapshots come
//! from: a reconnecting live session ([`LiveSource`]) or an in-memory channel
//! ([`ChannelSource`]) for embedding and tests.

mod channel;
mod connection;
mod live;
mod snapshot;
mod transport;

pub use channel::{ChannelSender, ChannelSource};
pub use connection::{ConnectionManager, ConnectionState, DEFAULT_RECONNECT_DELAY};
pub use live::LiveSource;
pub use snapshot::{
    DeviceId, DeviceReading, DiskReading, MemoryReading, NetworkReading, Snapshot, SystemReading,
};
pub use transport::{
    line_frames, Connector, Endpoint, FrameStream, SourceError, TcpConnector, WebSocketConnector,
    DEFAULT_CONNECT_TIMEOUT,
};

use std::fmt::Debug;

/// Something a data source reports to its consumer.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// The session moved to a new state.
    State(ConnectionState),
    /// A complete snapshot arrived.
    Snapshot(Box<Snapshot>),
    /// The session ended with this fault. A reconnect follows.
    Error(String),
}

/// Trait for receiving metric snapshots from various sources.
///
/// Events are returned in the order they happened, one at a time.
///
/// # Example
///
/// ```
/// use hostwatch::source::{ChannelSource, DataSource, SourceEvent};
///
/// let (_tx, mut source) = ChannelSource::create("example");
/// while let Some(event) = source.poll() {
///     if let SourceEvent::Snapshot(snapshot) = event {
///         println!("cpu at {}%", snapshot.system.cpu_percent);
///     }
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Take the next pending event, if any.
    ///
    /// This method must not block.
    fn poll(&mut self) -> Option<SourceEvent>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;

    /// Stop for good. No reconnect attempts happen afterwards.
    fn shutdown(&mut self) {}
}
