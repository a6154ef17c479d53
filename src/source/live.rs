//! Self-healing live source.
//!
//! Spawns a background task that drives a [`ConnectionManager`] against a
//! [`Connector`]: it opens a session, forwards parsed snapshots in arrival
//! order, and on any session fault waits the fixed reconnect delay before
//! trying again. The TUI thread drains the resulting [`SourceEvent`]s through
//! [`DataSource::poll`] without blocking.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::connection::{ConnectionManager, ConnectionState};
use super::transport::{Connector, SourceError};
use super::{DataSource, SourceEvent, Snapshot};

/// Capacity of the event queue between the driver task and the TUI.
const EVENT_QUEUE: usize = 64;

/// A data source backed by a reconnecting streaming session.
///
/// Must be created from within a tokio runtime context.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use hostwatch::source::{Endpoint, LiveSource, WebSocketConnector};
///
/// # tokio_test::block_on(async {
/// let endpoint = Endpoint::new("localhost:8000", false, "/ws");
/// let connector = Arc::new(WebSocketConnector::new(&endpoint));
/// let source = LiveSource::spawn(connector, Duration::from_secs(3));
/// # });
/// ```
#[derive(Debug)]
pub struct LiveSource {
    receiver: mpsc::Receiver<SourceEvent>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    description: String,
}

impl LiveSource {
    /// Spawn the driver task and return the source end.
    pub fn spawn(connector: Arc<dyn Connector>, reconnect_delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let description = format!("live: {}", connector.describe());

        let manager = ConnectionManager::new(reconnect_delay);
        let handle = tokio::spawn(drive(connector, manager, tx, shutdown_rx));

        Self {
            receiver: rx,
            shutdown: shutdown_tx,
            handle: Some(handle),
            description,
        }
    }
}

impl DataSource for LiveSource {
    fn poll(&mut self) -> Option<SourceEvent> {
        self.receiver.try_recv().ok()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn shutdown(&mut self) {
        let _ = self.shutdown.send(true);
        self.handle.take();
    }
}

impl Drop for LiveSource {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// How a session ended.
enum SessionEnd {
    /// Any transport fault; leads to a reconnect.
    Fault(SourceError),
    /// The consumer went away; stop for good.
    ConsumerGone,
}

async fn drive(
    connector: Arc<dyn Connector>,
    mut manager: ConnectionManager,
    tx: mpsc::Sender<SourceEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    manager.connect();

    loop {
        if tx.send(SourceEvent::State(manager.state())).await.is_err() {
            break;
        }
        debug!(attempt = manager.attempts(), "connecting to {}", connector.describe());

        let end = tokio::select! {
            _ = shutdown.changed() => break,
            end = run_session(connector.as_ref(), &mut manager, &tx) => end,
        };

        let fault = match end {
            SessionEnd::Fault(fault) => fault,
            SessionEnd::ConsumerGone => break,
        };

        let Some(deadline) = manager.closed(Instant::now().into_std()) else {
            break;
        };
        warn!(
            error = %fault,
            "session ended, reconnecting in {:?}",
            manager.reconnect_delay()
        );

        if tx.send(SourceEvent::Error(fault.to_string())).await.is_err()
            || tx.send(SourceEvent::State(manager.state())).await.is_err()
        {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep_until(Instant::from_std(deadline)) => {}
        }

        if !manager.poll_reconnect(Instant::now().into_std()) {
            break;
        }
    }

    manager.shutdown();
    debug!("live source stopped");
}

/// Run one session until it faults.
///
/// The frame stream is dropped on return, which closes the session.
async fn run_session(
    connector: &dyn Connector,
    manager: &mut ConnectionManager,
    tx: &mpsc::Sender<SourceEvent>,
) -> SessionEnd {
    let mut frames = match connector.connect().await {
        Ok(frames) => frames,
        Err(e) => return SessionEnd::Fault(e),
    };

    manager.opened();
    info!("connected to {}", connector.describe());
    if tx.send(SourceEvent::State(ConnectionState::Connected)).await.is_err() {
        return SessionEnd::ConsumerGone;
    }

    loop {
        let frame = match frames.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return SessionEnd::Fault(e),
            None => return SessionEnd::Fault(SourceError::Closed),
        };

        // A frame that does not parse ends the session; it is not retried
        let snapshot = match Snapshot::from_frame(&frame) {
            Ok(snapshot) => snapshot,
            Err(e) => return SessionEnd::Fault(SourceError::Malformed(e.to_string())),
        };

        if tx.send(SourceEvent::Snapshot(Box::new(snapshot))).await.is_err() {
            return SessionEnd::ConsumerGone;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FrameStream;
    use async_trait::async_trait;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays one scripted session per connect; `None` refuses the attempt.
    #[derive(Debug)]
    struct ScriptedConnector {
        sessions: Mutex<VecDeque<Option<Vec<String>>>>,
        attempts: AtomicUsize,
    }

    impl ScriptedConnector {
        fn new(sessions: Vec<Option<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                sessions: Mutex::new(sessions.into()),
                attempts: AtomicUsize::new(0),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self) -> Result<FrameStream, SourceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.sessions.lock().unwrap().pop_front().flatten() {
                Some(frames) => Ok(stream::iter(frames.into_iter().map(Ok)).boxed()),
                None => Err(SourceError::Connect("refused".to_string())),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn frame(cpu: u32) -> String {
        format!(
            r#"{{"system":{{"cpu":{},"memory":{{"percent":50}},"network":{{"speed_sent_bytes":1,"speed_recv_bytes":2}}}},"gpus":[]}}"#,
            cpu
        )
    }

    fn drain(source: &mut LiveSource) -> Vec<SourceEvent> {
        std::iter::from_fn(|| source.poll()).collect()
    }

    fn states(events: &[SourceEvent]) -> Vec<ConnectionState> {
        events
            .iter()
            .filter_map(|e| match e {
                SourceEvent::State(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn cpus(events: &[SourceEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                SourceEvent::Snapshot(s) => Some(s.system.cpu_percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_snapshots_in_order_then_disconnects() {
        let connector = ScriptedConnector::new(vec![Some(vec![frame(1), frame(2), frame(3)])]);
        let mut source = LiveSource::spawn(connector.clone(), Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let events = drain(&mut source);

        assert_eq!(cpus(&events), vec![1.0, 2.0, 3.0]);
        assert_eq!(
            states(&events),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
            ]
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, SourceEvent::Error(msg) if msg == "Connection closed")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_reconnect_after_fixed_delay() {
        let connector = ScriptedConnector::new(vec![Some(vec![frame(1)]), None, None]);
        let mut source = LiveSource::spawn(connector.clone(), Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(connector.attempts(), 1);

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(connector.attempts(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.attempts(), 2);

        // Refused attempt at t=3s schedules exactly one more at t=6s
        tokio::time::sleep(Duration::from_millis(2800)).await;
        assert_eq!(connector.attempts(), 2);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.attempts(), 3);

        drain(&mut source);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_ends_session() {
        let connector = ScriptedConnector::new(vec![
            Some(vec![frame(1), "not json".to_string(), frame(2)]),
            Some(vec![frame(7)]),
        ]);
        let mut source = LiveSource::spawn(connector.clone(), Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let events = drain(&mut source);

        // The frame after the malformed one belongs to the closed session
        assert_eq!(cpus(&events), vec![1.0]);
        assert!(events
            .iter()
            .any(|e| matches!(e, SourceEvent::Error(msg) if msg.starts_with("Malformed frame"))));

        tokio::time::sleep(Duration::from_secs(3)).await;
        let events = drain(&mut source);
        assert_eq!(connector.attempts(), 2);
        assert_eq!(cpus(&events), vec![7.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_reconnects() {
        let connector = ScriptedConnector::new(vec![None, None, None]);
        let mut source = LiveSource::spawn(connector.clone(), Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(connector.attempts(), 1);

        source.shutdown();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_description_names_endpoint() {
        let connector = ScriptedConnector::new(vec![]);
        let source = LiveSource::spawn(connector, Duration::from_secs(3));
        assert_eq!(source.description(), "live: scripted");
    }
}
