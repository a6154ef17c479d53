//! Local notification channels: desktop notifications and the terminal bell.

use std::fmt::Debug;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

/// Default program used for desktop notifications.
pub const DEFAULT_NOTIFY_COMMAND: &str = "notify-send";

/// Shows a desktop notification.
pub trait Notifier: Send + Debug {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Runs an external program as `<program> <title> <body>`.
///
/// The program is started and left to finish on its own; its exit status is
/// only logged.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl Default for CommandNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFY_COMMAND)
    }
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to run {}", self.program))?;

        let program = self.program.clone();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => warn!("{} exited with {}", program, status),
            Err(e) => warn!("{} did not finish: {}", program, e),
            Ok(_) => {}
        });
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    /// Notifications sent so far, as `(title, body)` pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("notification log poisoned"))?
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Ring the terminal bell.
pub fn ring_bell() -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(b"\x07")?;
    stdout.flush()
}
