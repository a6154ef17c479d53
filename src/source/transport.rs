//! Transports that open a streaming session to the metrics producer.
//!
//! A [`Connector`] turns an endpoint into a [`FrameStream`]: a stream of text
//! frames, one per sampling tick. The live source parses the frames; the
//! connector only moves bytes.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

/// How long opening a session may take before the attempt counts as failed.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Faults that end a streaming session.
///
/// None of these are fatal to the client: each one leads to the same
/// fixed-delay reconnect.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The endpoint could not be reached or refused the handshake.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The session broke while reading.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A frame could not be parsed as a snapshot.
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// The remote side closed the session.
    #[error("Connection closed")]
    Closed,
}

/// Text frames of one session, in arrival order.
///
/// The stream ends (or yields an error) when the session terminates.
pub type FrameStream = BoxStream<'static, Result<String, SourceError>>;

/// Opens streaming sessions to a fixed endpoint.
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    /// Open a new session.
    async fn connect(&self) -> Result<FrameStream, SourceError>;

    /// Human-readable endpoint, shown in the status bar.
    fn describe(&self) -> String;
}

/// Address of the producer's streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `host[:port]` of the producer.
    pub host: String,
    /// Use the secure variant of the protocol (`wss://`).
    pub secure: bool,
    /// Request path of the WebSocket endpoint.
    pub path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, secure: bool, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            secure,
            path: path.into(),
        }
    }

    /// WebSocket URL for this endpoint, e.g. `ws://localhost:8000/ws`.
    pub fn websocket_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let path = self.path.trim_start_matches('/');
        format!("{}://{}/{}", scheme, self.host.trim_end_matches('/'), path)
    }
}

/// Connects over WebSocket and yields each text message as a frame.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            url: endpoint.websocket_url(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Give up on an attempt (TCP, TLS and the upgrade together) after `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<FrameStream, SourceError> {
        install_crypto_provider();

        let (socket, _response) =
            within(self.connect_timeout, tokio_tungstenite::connect_async(self.url.as_str()))
                .await?
                .map_err(|e| SourceError::Connect(e.to_string()))?;

        let frames = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => Some(
                    String::from_utf8(bytes).map_err(|e| SourceError::Malformed(e.to_string())),
                ),
                Ok(Message::Close(_)) => Some(Err(SourceError::Closed)),
                // Ping/pong are answered by tungstenite itself
                Ok(_) => None,
                Err(e) => Some(Err(SourceError::Transport(e.to_string()))),
            }
        });

        Ok(frames.boxed())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Connects over plain TCP and reads newline-delimited JSON frames.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<FrameStream, SourceError> {
        let stream = within(self.connect_timeout, TcpStream::connect(&self.addr))
            .await?
            .map_err(|e| SourceError::Connect(format!("{}: {}", self.addr, e)))?;
        Ok(line_frames(stream))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// Run a connect attempt, failing it once `timeout` has passed.
async fn within<F: Future>(timeout: Duration, attempt: F) -> Result<F::Output, SourceError> {
    tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| SourceError::Connect(format!("timed out after {:?}", timeout)))
}

/// Select ring as the process-wide rustls provider.
///
/// `wss://` handshakes cannot build a TLS config without one. Installing
/// fails harmlessly when a provider is already in place.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Split an async reader into newline-delimited frames.
///
/// Blank lines are skipped. The stream ends at EOF.
pub fn line_frames<R>(reader: R) -> FrameStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let lines = BufReader::new(reader).lines();

    stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some((Ok(line), lines)),
                Ok(None) => return None,
                Err(e) => return Some((Err(SourceError::Transport(e.to_string())), lines)),
            }
        }
    })
    .boxed()
}
