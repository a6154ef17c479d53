//! Idle-device alerting.
//!
//! [`AlertEngine`] owns the state machine; everything with a side effect
//! (the tone, desktop notifications, writing settings) goes through the
//! [`AlertSink`] capability so the engine stays deterministic.

mod engine;
mod notify;

pub use engine::{
    AlertEngine, MonitorConfig, MonitorConfigs, PendingAlert, DEFAULT_SUSTAIN_SECONDS,
    DEFAULT_THRESHOLD_PERCENT,
};
pub use notify::{
    ring_bell, CommandNotifier, Notifier, RecordingNotifier, DEFAULT_NOTIFY_COMMAND,
};

use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::data::units::format_elapsed;
use crate::source::DeviceId;

/// A single fired idle alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEpisode {
    pub device_id: DeviceId,
    pub device_name: String,
    /// Memory utilization observed when the alert fired.
    pub idle_percent: f64,
    /// How long the device had been idle.
    pub elapsed: Duration,
}

impl AlertEpisode {
    pub fn title(&self) -> &'static str {
        "Device idle"
    }

    /// One-line description, e.g. `RTX 4090 [ID:0] memory usage low (5%) for 1m 0s`.
    pub fn body(&self) -> String {
        format!(
            "{} [ID:{}] memory usage low ({}%) for {}",
            self.device_name,
            self.device_id,
            self.idle_percent,
            format_elapsed(self.elapsed)
        )
    }
}

/// Side effects of a fired alert.
///
/// Each call is independent and best-effort: the engine logs a failure and
/// carries on with the next one.
pub trait AlertSink {
    /// Play a short audible tone.
    fn play_tone(&mut self) -> Result<()>;

    /// Show a notification for the episode, if the user allowed it.
    fn notify(&mut self, episode: &AlertEpisode) -> Result<()>;

    /// Persist the full set of monitor configs.
    fn persist(&mut self, configs: &MonitorConfigs) -> Result<()>;
}

/// Sink that records every call. Used to drive the engine in tests and
/// headless embeddings.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub tones: usize,
    pub notified: Vec<AlertEpisode>,
    pub persisted: Vec<MonitorConfigs>,
    fail: bool,
}

impl RecordingSink {
    /// A sink whose every side effect fails without recording anything.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            Err(anyhow!("sink unavailable"))
        } else {
            Ok(())
        }
    }
}

impl AlertSink for RecordingSink {
    fn play_tone(&mut self) -> Result<()> {
        self.check()?;
        self.tones += 1;
        Ok(())
    }

    fn notify(&mut self, episode: &AlertEpisode) -> Result<()> {
        self.check()?;
        self.notified.push(episode.clone());
        Ok(())
    }

    fn persist(&mut self, configs: &MonitorConfigs) -> Result<()> {
        self.check()?;
        self.persisted.push(configs.clone());
        Ok(())
    }
}
