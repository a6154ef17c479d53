//! Application state and navigation logic.
//!
//! [`App`] owns the whole pipeline. Every snapshot drained from the source is
//! applied in one synchronous pass: the alert engine first, then the
//! sliding-window buffers, then the chart projection.

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::alert::{
    ring_bell, AlertEngine, AlertEpisode, AlertSink, MonitorConfig, MonitorConfigs, Notifier,
};
use crate::data::{ChartModel, ChartProjector, DeviceChartState, TimeSeriesBuffer};
use crate::settings::{NotificationPermission, Preferences};
use crate::source::{ConnectionState, DataSource, DeviceId, DeviceReading, Snapshot, SourceEvent};
use crate::ui::Theme;

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// How long a fired alert stays in the status bar.
const ALERT_BANNER_TTL: Duration = Duration::from_secs(10);

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Live charts for the host and its devices.
    Dashboard,
    /// Per-device table with monitor status.
    Devices,
    /// Memory, disks, and network totals.
    System,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Dashboard => View::Devices,
            View::Devices => View::System,
            View::System => View::Dashboard,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Dashboard => View::System,
            View::Devices => View::Dashboard,
            View::System => View::Devices,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Devices => "Devices",
            View::System => "System",
        }
    }
}

/// Monitor state of one device, as shown in the Devices view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// No config, or the monitor is switched off.
    Off,
    /// Enabled, device currently busy.
    Watching,
    /// Enabled and idle for this long.
    Pending(Duration),
}

/// Field of the monitor form that receives input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Enabled,
    Threshold,
    Duration,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Enabled => FormField::Threshold,
            FormField::Threshold => FormField::Duration,
            FormField::Duration => FormField::Enabled,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Enabled => FormField::Duration,
            FormField::Threshold => FormField::Enabled,
            FormField::Duration => FormField::Threshold,
        }
    }
}

/// Edit buffer for one device's monitor config.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorForm {
    pub device_id: DeviceId,
    pub device_name: String,
    pub enabled: bool,
    pub threshold: String,
    pub duration: String,
    pub focus: FormField,
}

impl MonitorForm {
    fn new(device: &DeviceReading, config: &MonitorConfig) -> Self {
        Self {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            enabled: config.enabled,
            threshold: format!("{}", config.threshold_percent),
            duration: config.sustain_seconds.to_string(),
            focus: FormField::Enabled,
        }
    }

    /// Parse the edit buffer into a config.
    pub fn to_config(&self) -> Result<MonitorConfig> {
        let threshold_percent: f64 = match self.threshold.trim().parse() {
            Ok(v) => v,
            Err(_) => bail!("Threshold must be a number"),
        };
        if !(0.0..=100.0).contains(&threshold_percent) {
            bail!("Threshold must be between 0 and 100");
        }
        let sustain_seconds: u64 = match self.duration.trim().parse() {
            Ok(v) => v,
            Err(_) => bail!("Duration must be a whole number of seconds"),
        };
        Ok(MonitorConfig {
            enabled: self.enabled,
            threshold_percent,
            sustain_seconds,
        })
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn prev_field(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn toggle_enabled(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Type into the focused field. Only digits and one decimal point are
    /// accepted, the latter for the threshold only.
    pub fn push(&mut self, c: char) {
        match self.focus {
            FormField::Enabled => {}
            FormField::Threshold => {
                if c.is_ascii_digit() || (c == '.' && !self.threshold.contains('.')) {
                    self.threshold.push(c);
                }
            }
            FormField::Duration => {
                if c.is_ascii_digit() {
                    self.duration.push(c);
                }
            }
        }
    }

    pub fn pop(&mut self) {
        match self.focus {
            FormField::Enabled => {}
            FormField::Threshold => {
                self.threshold.pop();
            }
            FormField::Duration => {
                self.duration.pop();
            }
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    // Data source
    source: Box<dyn DataSource>,
    pub connection: ConnectionState,
    pub last_error: Option<String>,
    pub latest: Option<Snapshot>,
    pub last_updated: Option<Instant>,

    // Pipeline
    pub buffer: TimeSeriesBuffer,
    pub chart: ChartModel,
    pub device_chart: DeviceChartState,
    engine: AlertEngine,

    // Side effects
    prefs: Preferences,
    notifier: Box<dyn Notifier>,
    bell: bool,

    // Navigation and overlays
    pub selected_device: usize,
    pub monitor_form: Option<MonitorForm>,
    pub permission_prompt: bool,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
    pub alert_banner: Option<(String, Instant)>,
}

impl App {
    /// Create a new App.
    ///
    /// Monitor configs and the theme come from `prefs`; `history` is the
    /// number of samples kept per chart series.
    pub fn new(
        source: Box<dyn DataSource>,
        prefs: Preferences,
        notifier: Box<dyn Notifier>,
        history: usize,
    ) -> Self {
        let engine = AlertEngine::new(prefs.settings().monitors.clone());
        let theme = Theme::for_preference(prefs.dark_mode());
        Self {
            running: true,
            current_view: View::Dashboard,
            show_help: false,
            source,
            connection: ConnectionState::Disconnected,
            last_error: None,
            latest: None,
            last_updated: None,
            buffer: TimeSeriesBuffer::new(history),
            chart: ChartModel::default(),
            device_chart: DeviceChartState::default(),
            engine,
            prefs,
            notifier,
            bell: true,
            selected_device: 0,
            monitor_form: None,
            permission_prompt: false,
            theme,
            status_message: None,
            alert_banner: None,
        }
    }

    /// Enable or disable the terminal bell on alerts.
    pub fn with_bell(mut self, bell: bool) -> Self {
        self.bell = bell;
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Drain every pending source event.
    ///
    /// Returns the number of events handled.
    pub fn poll_source(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.source.poll() {
            self.handle_source_event(event);
            handled += 1;
        }
        handled
    }

    fn handle_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::State(state) => {
                self.connection = state;
                if state == ConnectionState::Connected {
                    self.last_error = None;
                }
            }
            SourceEvent::Snapshot(snapshot) => {
                self.apply_snapshot(*snapshot, Instant::now());
            }
            SourceEvent::Error(message) => self.last_error = Some(message),
        }
    }

    /// Run one snapshot through the pipeline.
    ///
    /// Returns the alert episodes that fired.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot, now: Instant) -> Vec<AlertEpisode> {
        let mut sink = AppSink {
            prefs: &mut self.prefs,
            notifier: self.notifier.as_ref(),
            bell: self.bell,
        };
        let fired = self.engine.evaluate(&snapshot, now, &mut sink);
        if let Some(episode) = fired.last() {
            self.alert_banner = Some((
                format!("{}: {}", episode.title(), episode.body()),
                now,
            ));
        }

        self.buffer.append(&snapshot);
        if self.device_chart.observe(&snapshot) {
            info!(devices = snapshot.devices.len(), "device chart initialized");
        }
        self.chart = ChartProjector::project(&self.buffer);

        let count = snapshot.devices.len();
        if self.selected_device >= count {
            self.selected_device = count.saturating_sub(1);
        }
        self.latest = Some(snapshot);
        self.last_updated = Some(now);

        fired
    }

    /// Monitor state of a device at `now`.
    pub fn monitor_status(&self, id: &DeviceId, now: Instant) -> MonitorStatus {
        match self.engine.config(id) {
            Some(config) if config.enabled => match self.engine.pending_for(id) {
                Some(pending) => MonitorStatus::Pending(pending.elapsed(now)),
                None => MonitorStatus::Watching,
            },
            _ => MonitorStatus::Off,
        }
    }

    /// Devices of the latest snapshot, in the order reported.
    pub fn devices(&self) -> &[DeviceReading] {
        self.latest.as_ref().map(|s| s.devices.as_slice()).unwrap_or(&[])
    }

    pub fn selected_device(&self) -> Option<&DeviceReading> {
        self.devices().get(self.selected_device)
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move device selection down by one.
    pub fn select_next(&mut self) {
        let max = self.devices().len().saturating_sub(1);
        self.selected_device = (self.selected_device + 1).min(max);
    }

    /// Move device selection up by one.
    pub fn select_prev(&mut self) {
        self.selected_device = self.selected_device.saturating_sub(1);
    }

    /// Open the monitor form for the selected device.
    pub fn open_monitor_form(&mut self) {
        let Some(device) = self.selected_device() else {
            self.set_status_message("No device selected".to_string());
            return;
        };
        let config = self.engine.config(&device.id).cloned().unwrap_or_default();
        self.monitor_form = Some(MonitorForm::new(device, &config));
    }

    pub fn cancel_monitor_form(&mut self) {
        self.monitor_form = None;
    }

    /// Validate and store the form's config.
    ///
    /// Invalid input keeps the form open. Enabling a monitor while the
    /// notification permission is undecided opens the permission prompt.
    pub fn save_monitor_form(&mut self) {
        let Some(form) = self.monitor_form.as_ref() else {
            return;
        };
        let config = match form.to_config() {
            Ok(config) => config,
            Err(e) => {
                self.set_status_message(e.to_string());
                return;
            }
        };
        let Some(form) = self.monitor_form.take() else {
            return;
        };

        let enabled = config.enabled;
        info!(device = %form.device_id, enabled, "monitor updated");
        self.engine.set_config(form.device_id.clone(), config);
        self.persist_monitors();

        if enabled && self.prefs.permission().is_undecided() {
            self.permission_prompt = true;
        }
        self.set_status_message(format!(
            "Monitor for {} {}",
            form.device_name,
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    /// Record the answer to the notification permission prompt.
    pub fn answer_permission(&mut self, granted: bool) {
        self.permission_prompt = false;
        let permission = if granted {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        if let Err(e) = self.prefs.set_permission(permission) {
            warn!(error = %format!("{:#}", e), "failed to save notification permission");
        }
    }

    /// Switch between dark and light and remember the choice.
    pub fn toggle_dark_mode(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(e) = self.prefs.set_dark_mode(self.theme.dark) {
            warn!(error = %format!("{:#}", e), "failed to save theme");
            self.set_status_message("Could not save theme".to_string());
        }
    }

    fn persist_monitors(&mut self) {
        if let Err(e) = self.prefs.save_monitors(self.engine.configs()) {
            warn!(error = %format!("{:#}", e), "failed to save monitor settings");
            self.set_status_message("Could not save monitor settings".to_string());
        }
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        fresh(&self.status_message, STATUS_MESSAGE_TTL)
    }

    /// Get the most recent alert if it hasn't expired.
    pub fn get_alert_banner(&self) -> Option<&str> {
        fresh(&self.alert_banner, ALERT_BANNER_TTL)
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Stop the source for good and signal the application to quit.
    pub fn quit(&mut self) {
        self.source.shutdown();
        self.running = false;
    }
}

fn fresh(entry: &Option<(String, Instant)>, ttl: Duration) -> Option<&str> {
    match entry {
        Some((msg, time)) if time.elapsed() < ttl => Some(msg),
        _ => None,
    }
}

/// Alert side effects as the running app performs them.
struct AppSink<'a> {
    prefs: &'a mut Preferences,
    notifier: &'a dyn Notifier,
    bell: bool,
}

impl AlertSink for AppSink<'_> {
    fn play_tone(&mut self) -> Result<()> {
        if self.bell {
            ring_bell()?;
        }
        Ok(())
    }

    fn notify(&mut self, episode: &AlertEpisode) -> Result<()> {
        if !self.prefs.permission().is_granted() {
            return Ok(());
        }
        self.notifier.notify(episode.title(), &episode.body())
    }

    fn persist(&mut self, configs: &MonitorConfigs) -> Result<()> {
        self.prefs.save_monitors(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::RecordingNotifier;
    use crate::settings::{MemoryStore, Settings};
    use crate::source::{ChannelSender, ChannelSource};

    fn frame(devices: &[(u64, f64)]) -> Snapshot {
        let gpus: Vec<String> = devices
            .iter()
            .map(|(id, mem)| {
                format!(
                    r#"{{"id":{},"name":"GPU{}","gpu_util":30,"mem_percent":{}}}"#,
                    id, id, mem
                )
            })
            .collect();
        Snapshot::from_frame(&format!(
            r#"{{"system":{{"cpu":12,"memory":{{"percent":40}},"network":{{"speed_sent_bytes":10,"speed_recv_bytes":20}}}},"gpus":[{}]}}"#,
            gpus.join(",")
        ))
        .unwrap()
    }

    struct Harness {
        app: App,
        tx: ChannelSender,
        store: MemoryStore,
        notifier: RecordingNotifier,
    }

    fn harness(settings: Settings) -> Harness {
        let (tx, source) = ChannelSource::create("test");
        let store = MemoryStore::with(Settings {
            dark_mode: Some(true),
            ..settings
        });
        let notifier = RecordingNotifier::default();
        let prefs = Preferences::open(Box::new(store.clone()));
        let app = App::new(Box::new(source), prefs, Box::new(notifier.clone()), 60).with_bell(false);
        Harness {
            app,
            tx,
            store,
            notifier,
        }
    }

    #[test]
    fn test_view_cycle() {
        assert_eq!(View::Dashboard.next(), View::Devices);
        assert_eq!(View::System.next(), View::Dashboard);
        assert_eq!(View::Dashboard.prev(), View::System);
        assert_eq!(View::Devices.label(), "Devices");
    }

    #[test]
    fn test_poll_source_applies_events_in_order() {
        let mut h = harness(Settings::default());
        h.tx.send_state(ConnectionState::Connecting);
        h.tx.send_state(ConnectionState::Connected);
        h.tx.send_snapshot(frame(&[(0, 50.0)]));
        h.tx.send_snapshot(frame(&[(0, 60.0), (1, 5.0)]));

        assert_eq!(h.app.poll_source(), 4);
        assert!(h.app.is_connected());
        assert_eq!(h.app.buffer.len(), 2);
        assert_eq!(h.app.chart.labels.len(), 2);
        assert_eq!(h.app.chart.devices.len(), 2);
        assert!(h.app.device_chart.is_initialized());
        assert_eq!(h.app.devices().len(), 2);
    }

    #[test]
    fn test_error_then_reconnect_updates_indicator() {
        let mut h = harness(Settings::default());
        h.tx.send_state(ConnectionState::Connected);
        h.tx.send(SourceEvent::Error("Connection closed".to_string()));
        h.tx.send_state(ConnectionState::Disconnected);
        h.app.poll_source();

        assert!(!h.app.is_connected());
        assert_eq!(h.app.last_error.as_deref(), Some("Connection closed"));

        h.tx.send_state(ConnectionState::Connected);
        h.app.poll_source();
        assert!(h.app.is_connected());
        assert!(h.app.last_error.is_none());
    }

    #[test]
    fn test_device_chart_waits_for_devices() {
        let mut h = harness(Settings::default());
        h.app.apply_snapshot(frame(&[]), Instant::now());
        assert!(!h.app.device_chart.is_initialized());
        assert!(h.app.chart.devices.is_empty());
        assert_eq!(h.app.chart.labels.len(), 1);
    }

    #[test]
    fn test_alert_persists_and_notifies_when_granted() {
        let mut settings = Settings {
            notification_permission: NotificationPermission::Granted,
            ..Settings::default()
        };
        settings
            .monitors
            .insert(DeviceId::Index(0), MonitorConfig::enabled(10.0, 0));
        let mut h = harness(settings);

        let fired = h.app.apply_snapshot(frame(&[(0, 5.0)]), Instant::now());
        assert_eq!(fired.len(), 1);
        assert_eq!(h.notifier.sent().len(), 1);
        assert_eq!(h.notifier.sent()[0].0, "Device idle");
        assert!(h.app.get_alert_banner().unwrap().contains("GPU0"));

        let saved = h.store.latest().unwrap();
        assert!(!saved.monitors[&DeviceId::Index(0)].enabled);
        assert_eq!(h.app.monitor_status(&DeviceId::Index(0), Instant::now()), MonitorStatus::Off);
    }

    #[test]
    fn test_snapshot_timestamps_use_evaluation_time() {
        let mut settings = Settings::default();
        settings
            .monitors
            .insert(DeviceId::Index(0), MonitorConfig::enabled(10.0, 60));
        let mut h = harness(settings);
        let start = Instant::now();
        let at = |s: u64| start + Duration::from_secs(s);

        h.app.apply_snapshot(frame(&[(0, 5.0)]), at(0));
        assert_eq!(h.app.last_updated, Some(at(0)));
        assert!(h.app.alert_banner.is_none());

        let fired = h.app.apply_snapshot(frame(&[(0, 5.0)]), at(60));
        assert_eq!(fired.len(), 1);
        assert_eq!(h.app.last_updated, Some(at(60)));
        assert_eq!(h.app.alert_banner.as_ref().map(|(_, t)| *t), Some(at(60)));
    }

    #[test]
    fn test_alert_without_permission_skips_notification() {
        let mut settings = Settings::default();
        settings
            .monitors
            .insert(DeviceId::Index(0), MonitorConfig::enabled(10.0, 0));
        let mut h = harness(settings);

        assert_eq!(h.app.apply_snapshot(frame(&[(0, 5.0)]), Instant::now()).len(), 1);
        assert!(h.notifier.sent().is_empty());
        assert!(!h.store.latest().unwrap().monitors[&DeviceId::Index(0)].enabled);
    }

    #[test]
    fn test_monitor_status_reports_pending_time() {
        let mut settings = Settings::default();
        settings
            .monitors
            .insert(DeviceId::Index(0), MonitorConfig::enabled(10.0, 60));
        let mut h = harness(settings);
        let start = Instant::now();

        assert_eq!(h.app.monitor_status(&DeviceId::Index(0), start), MonitorStatus::Watching);
        h.app.apply_snapshot(frame(&[(0, 5.0)]), start);
        assert_eq!(
            h.app.monitor_status(&DeviceId::Index(0), start + Duration::from_secs(12)),
            MonitorStatus::Pending(Duration::from_secs(12))
        );
    }

    #[test]
    fn test_monitor_form_save_enables_and_prompts() {
        let mut h = harness(Settings::default());
        h.app.apply_snapshot(frame(&[(0, 50.0), (1, 50.0)]), Instant::now());
        h.app.select_next();
        h.app.open_monitor_form();

        let form = h.app.monitor_form.as_mut().unwrap();
        assert_eq!(form.device_id, DeviceId::Index(1));
        assert_eq!(form.threshold, "10");
        assert_eq!(form.duration, "60");
        form.toggle_enabled();
        form.next_field();
        form.pop();
        form.pop();
        form.push('2');
        form.push('5');
        form.next_field();
        form.push('0');

        h.app.save_monitor_form();
        assert!(h.app.monitor_form.is_none());
        assert!(h.app.permission_prompt);
        assert_eq!(
            h.app.engine().config(&DeviceId::Index(1)),
            Some(&MonitorConfig::enabled(25.0, 600))
        );
        assert_eq!(
            h.store.latest().unwrap().monitors[&DeviceId::Index(1)],
            MonitorConfig::enabled(25.0, 600)
        );

        h.app.answer_permission(true);
        assert!(!h.app.permission_prompt);
        assert!(h.store.latest().unwrap().notification_permission.is_granted());
    }

    #[test]
    fn test_monitor_form_rejects_bad_threshold() {
        let mut h = harness(Settings::default());
        h.app.apply_snapshot(frame(&[(0, 50.0)]), Instant::now());
        h.app.open_monitor_form();
        {
            let form = h.app.monitor_form.as_mut().unwrap();
            form.threshold = "150".to_string();
        }
        h.app.save_monitor_form();

        assert!(h.app.monitor_form.is_some());
        assert!(h.app.get_status_message().unwrap().contains("Threshold"));
        assert!(h.app.engine().config(&DeviceId::Index(0)).is_none());
    }

    #[test]
    fn test_no_prompt_once_permission_decided() {
        let mut h = harness(Settings {
            notification_permission: NotificationPermission::Denied,
            ..Settings::default()
        });
        h.app.apply_snapshot(frame(&[(0, 50.0)]), Instant::now());
        h.app.open_monitor_form();
        h.app.monitor_form.as_mut().unwrap().toggle_enabled();
        h.app.save_monitor_form();

        assert!(!h.app.permission_prompt);
        assert!(h.app.engine().config(&DeviceId::Index(0)).unwrap().enabled);
    }

    #[test]
    fn test_toggle_dark_mode_is_persisted() {
        let mut h = harness(Settings::default());
        assert!(h.app.theme.dark);
        h.app.toggle_dark_mode();
        assert!(!h.app.theme.dark);
        assert_eq!(h.store.latest().unwrap().dark_mode, Some(false));
    }

    #[test]
    fn test_selection_clamped_when_devices_shrink() {
        let mut h = harness(Settings::default());
        h.app.apply_snapshot(frame(&[(0, 1.0), (1, 1.0), (2, 1.0)]), Instant::now());
        h.app.select_next();
        h.app.select_next();
        h.app.select_next();
        assert_eq!(h.app.selected_device, 2);

        h.app.apply_snapshot(frame(&[(0, 1.0)]), Instant::now());
        assert_eq!(h.app.selected_device, 0);
    }

    #[test]
    fn test_quit_shuts_source_down() {
        let mut h = harness(Settings::default());
        h.app.quit();
        assert!(!h.app.running);
        assert!(!h.tx.send_state(ConnectionState::Connected));
    }
}
