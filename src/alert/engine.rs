//! Per-device idle detection with debounce and one-shot firing.
//!
//! A device is idle while its memory utilization stays at or below the
//! configured threshold. Once it has been idle for the sustain period the
//! engine fires a single episode and switches the device's monitor off; the
//! user has to re-arm it explicitly.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AlertEpisode, AlertSink};
use crate::source::{DeviceId, DeviceReading, Snapshot};

/// Default idle threshold in percent.
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 10.0;

/// Default sustain period in seconds.
pub const DEFAULT_SUSTAIN_SECONDS: u64 = 60;

/// Idle monitor settings for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Memory utilization (percent) at or below which the device counts as idle.
    #[serde(rename = "threshold", default = "default_threshold")]
    pub threshold_percent: f64,

    /// How long the device must stay idle before the alert fires.
    #[serde(rename = "duration", default = "default_sustain")]
    pub sustain_seconds: u64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_PERCENT
}

fn default_sustain() -> u64 {
    DEFAULT_SUSTAIN_SECONDS
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            sustain_seconds: DEFAULT_SUSTAIN_SECONDS,
        }
    }
}

impl MonitorConfig {
    pub fn enabled(threshold_percent: f64, sustain_seconds: u64) -> Self {
        Self {
            enabled: true,
            threshold_percent,
            sustain_seconds,
        }
    }

    pub fn sustain(&self) -> Duration {
        Duration::from_secs(self.sustain_seconds)
    }
}

/// Monitor settings of every configured device.
pub type MonitorConfigs = BTreeMap<DeviceId, MonitorConfig>;

/// A device that has been idle since `since` and has not fired yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAlert {
    pub since: Instant,
}

impl PendingAlert {
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.since)
    }
}

/// Holds monitor configs and pending alerts, and evaluates snapshots
/// against them.
///
/// # Example
///
/// ```
/// use std::time::Instant;
/// use hostwatch::alert::{AlertEngine, MonitorConfig, RecordingSink};
/// use hostwatch::source::{DeviceId, Snapshot};
///
/// let mut engine = AlertEngine::default();
/// engine.set_config(DeviceId::Index(0), MonitorConfig::enabled(10.0, 0));
///
/// let snapshot = Snapshot::from_frame(
///     r#"{"system":{"cpu":1,"memory":{"percent":1},"network":{}},
///         "gpus":[{"id":0,"name":"GPU0","gpu_util":0,"mem_percent":5}]}"#,
/// ).unwrap();
///
/// let mut sink = RecordingSink::default();
/// let fired = engine.evaluate(&snapshot, Instant::now(), &mut sink);
/// assert_eq!(fired.len(), 1);
/// assert!(!engine.config(&DeviceId::Index(0)).unwrap().enabled);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    configs: MonitorConfigs,
    pending: BTreeMap<DeviceId, PendingAlert>,
}

impl AlertEngine {
    pub fn new(configs: MonitorConfigs) -> Self {
        Self {
            configs,
            pending: BTreeMap::new(),
        }
    }

    pub fn configs(&self) -> &MonitorConfigs {
        &self.configs
    }

    pub fn config(&self, id: &DeviceId) -> Option<&MonitorConfig> {
        self.configs.get(id)
    }

    /// Replace a device's config. A disabled config drops its pending alert.
    pub fn set_config(&mut self, id: DeviceId, config: MonitorConfig) {
        if !config.enabled {
            self.pending.remove(&id);
        }
        self.configs.insert(id, config);
    }

    pub fn pending_for(&self, id: &DeviceId) -> Option<&PendingAlert> {
        self.pending.get(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Evaluate every device of `snapshot` in device-id order.
    ///
    /// State transitions happen first and never depend on the sink; the
    /// sink's side effects are then attempted for each fired episode, and
    /// the configs are persisted once if anything fired.
    pub fn evaluate(
        &mut self,
        snapshot: &Snapshot,
        now: Instant,
        sink: &mut dyn AlertSink,
    ) -> Vec<AlertEpisode> {
        let mut devices: Vec<&DeviceReading> = snapshot.devices.iter().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));

        let mut fired = Vec::new();
        for device in devices {
            if let Some(episode) = self.evaluate_device(device, now) {
                fired.push(episode);
            }
        }

        for episode in &fired {
            info!(
                device = %episode.device_id,
                idle_percent = episode.idle_percent,
                elapsed_secs = episode.elapsed.as_secs(),
                "idle alert fired"
            );
            if let Err(e) = sink.play_tone() {
                warn!(error = %e, "failed to play alert tone");
            }
            if let Err(e) = sink.notify(episode) {
                warn!(error = %e, "failed to show notification");
            }
        }
        if !fired.is_empty() {
            if let Err(e) = sink.persist(&self.configs) {
                warn!(error = %e, "failed to persist monitor settings");
            }
        }

        fired
    }

    fn evaluate_device(&mut self, device: &DeviceReading, now: Instant) -> Option<AlertEpisode> {
        let config = match self.configs.get_mut(&device.id) {
            Some(config) if config.enabled => config,
            _ => {
                self.pending.remove(&device.id);
                return None;
            }
        };

        if device.memory_percent > config.threshold_percent {
            if self.pending.remove(&device.id).is_some() {
                debug!(device = %device.id, "idle period interrupted");
            }
            return None;
        }

        let pending = self.pending.entry(device.id.clone()).or_insert_with(|| {
            debug!(device = %device.id, "device went idle");
            PendingAlert { since: now }
        });
        let elapsed = pending.elapsed(now);
        if elapsed < config.sustain() {
            return None;
        }

        config.enabled = false;
        self.pending.remove(&device.id);

        Some(AlertEpisode {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            idle_percent: device.memory_percent,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::RecordingSink;

    fn snapshot(devices: &[(u64, f64)]) -> Snapshot {
        let gpus: Vec<String> = devices
            .iter()
            .map(|(id, mem)| {
                format!(
                    r#"{{"id":{},"name":"GPU{}","gpu_util":0,"mem_percent":{}}}"#,
                    id, id, mem
                )
            })
            .collect();
        Snapshot::from_frame(&format!(
            r#"{{"system":{{"cpu":1,"memory":{{"percent":1}},"network":{{}}}},"gpus":[{}]}}"#,
            gpus.join(",")
        ))
        .unwrap()
    }

    fn id(n: u64) -> DeviceId {
        DeviceId::Index(n)
    }

    #[test]
    fn test_fires_once_after_sustain() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(0), MonitorConfig::enabled(10.0, 60));
        let mut sink = RecordingSink::default();
        let start = Instant::now();
        let idle = snapshot(&[(0, 5.0)]);

        for secs in 0..60 {
            let fired = engine.evaluate(&idle, start + Duration::from_secs(secs), &mut sink);
            assert!(fired.is_empty(), "fired early at {}s", secs);
        }
        assert_eq!(sink.tones, 0);

        let fired = engine.evaluate(&idle, start + Duration::from_secs(60), &mut sink);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].device_id, id(0));
        assert_eq!(fired[0].idle_percent, 5.0);
        assert_eq!(fired[0].elapsed, Duration::from_secs(60));

        assert_eq!(sink.tones, 1);
        assert_eq!(sink.notified.len(), 1);
        assert_eq!(sink.persisted.len(), 1);
        assert!(!sink.persisted[0][&id(0)].enabled);
        assert!(!engine.config(&id(0)).unwrap().enabled);
        assert!(engine.pending_for(&id(0)).is_none());

        // Still idle, but the monitor is off now
        for secs in 61..200 {
            engine.evaluate(&idle, start + Duration::from_secs(secs), &mut sink);
        }
        assert_eq!(sink.tones, 1);
        assert!(engine.pending_for(&id(0)).is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(0), MonitorConfig::enabled(10.0, 0));
        let mut sink = RecordingSink::default();

        let fired = engine.evaluate(&snapshot(&[(0, 10.0)]), Instant::now(), &mut sink);
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn test_busy_tick_resets_pending_timer() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(0), MonitorConfig::enabled(10.0, 60));
        let mut sink = RecordingSink::default();
        let start = Instant::now();
        let at = |s: u64| start + Duration::from_secs(s);

        engine.evaluate(&snapshot(&[(0, 5.0)]), at(0), &mut sink);
        engine.evaluate(&snapshot(&[(0, 5.0)]), at(50), &mut sink);
        engine.evaluate(&snapshot(&[(0, 50.0)]), at(51), &mut sink);
        assert!(engine.pending_for(&id(0)).is_none());

        engine.evaluate(&snapshot(&[(0, 5.0)]), at(52), &mut sink);
        assert_eq!(engine.pending_for(&id(0)).unwrap().since, at(52));

        assert!(engine.evaluate(&snapshot(&[(0, 5.0)]), at(111), &mut sink).is_empty());
        assert_eq!(engine.evaluate(&snapshot(&[(0, 5.0)]), at(112), &mut sink).len(), 1);
    }

    #[test]
    fn test_pending_survives_device_absence() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(0), MonitorConfig::enabled(10.0, 60));
        let mut sink = RecordingSink::default();
        let start = Instant::now();
        let at = |s: u64| start + Duration::from_secs(s);

        assert!(engine.evaluate(&snapshot(&[(0, 5.0)]), at(0), &mut sink).is_empty());
        assert_eq!(engine.pending_for(&id(0)).unwrap().since, at(0));

        // Device missing from this snapshot: the timer keeps running
        assert!(engine.evaluate(&snapshot(&[(1, 90.0)]), at(30), &mut sink).is_empty());
        assert_eq!(engine.pending_for(&id(0)).unwrap().since, at(0));

        let fired = engine.evaluate(&snapshot(&[(0, 5.0)]), at(60), &mut sink);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].elapsed, Duration::from_secs(60));
        assert!(engine.pending_for(&id(0)).is_none());

        assert!(engine.evaluate(&snapshot(&[(0, 5.0)]), at(120), &mut sink).is_empty());
        assert_eq!(sink.tones, 1);
    }

    #[test]
    fn test_absent_or_disabled_config_never_pends() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(1), MonitorConfig::default());
        let mut sink = RecordingSink::default();
        let start = Instant::now();

        for secs in 0..120 {
            let fired = engine.evaluate(
                &snapshot(&[(0, 0.0), (1, 0.0)]),
                start + Duration::from_secs(secs),
                &mut sink,
            );
            assert!(fired.is_empty());
            assert_eq!(engine.pending_count(), 0);
        }
        assert_eq!(sink.tones, 0);
        assert!(sink.persisted.is_empty());
    }

    #[test]
    fn test_disabling_clears_pending() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(0), MonitorConfig::enabled(10.0, 60));
        let mut sink = RecordingSink::default();

        engine.evaluate(&snapshot(&[(0, 1.0)]), Instant::now(), &mut sink);
        assert!(engine.pending_for(&id(0)).is_some());

        engine.set_config(id(0), MonitorConfig::default());
        assert!(engine.pending_for(&id(0)).is_none());
    }

    #[test]
    fn test_zero_sustain_fires_on_first_evaluation() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(0), MonitorConfig::enabled(10.0, 0));
        let mut sink = RecordingSink::default();

        let fired = engine.evaluate(&snapshot(&[(0, 5.0)]), Instant::now(), &mut sink);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].elapsed, Duration::ZERO);
        assert!(!engine.config(&id(0)).unwrap().enabled);
    }

    #[test]
    fn test_episodes_in_device_id_order_and_persisted_once() {
        let mut engine = AlertEngine::default();
        for n in [2, 0, 1] {
            engine.set_config(id(n), MonitorConfig::enabled(10.0, 0));
        }
        let mut sink = RecordingSink::default();

        let fired = engine.evaluate(
            &snapshot(&[(2, 1.0), (0, 1.0), (1, 1.0)]),
            Instant::now(),
            &mut sink,
        );
        let ids: Vec<DeviceId> = fired.iter().map(|e| e.device_id.clone()).collect();
        assert_eq!(ids, vec![id(0), id(1), id(2)]);
        assert_eq!(sink.tones, 3);
        assert_eq!(sink.persisted.len(), 1);
    }

    #[test]
    fn test_failing_sink_does_not_affect_state() {
        let mut engine = AlertEngine::default();
        engine.set_config(id(0), MonitorConfig::enabled(10.0, 0));
        let mut sink = RecordingSink::failing();

        let fired = engine.evaluate(&snapshot(&[(0, 1.0)]), Instant::now(), &mut sink);
        assert_eq!(fired.len(), 1);
        assert!(!engine.config(&id(0)).unwrap().enabled);
        assert!(engine.pending_for(&id(0)).is_none());
    }

    #[test]
    fn test_config_uses_short_field_names() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"enabled":true,"threshold":15,"duration":30}"#).unwrap();
        assert_eq!(config, MonitorConfig::enabled(15.0, 30));

        let defaults: MonitorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, MonitorConfig::default());
    }
}
