//! # hostwatch
//!
//! A terminal dashboard for live host and GPU telemetry.
//!
//! The dashboard holds one streaming session to a metrics producer. Each
//! message is a full snapshot of CPU, memory, network, disk, and per-device
//! readings. Snapshots feed a sliding window of recent samples that is drawn as
//! line charts, and an alert engine that raises an exactly-once notification
//! when a watched device stays idle for too long.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Application                            │
//! │  ┌──────────┐   ┌─────────────────┐   ┌───────────────┐          │
//! │  │  source  │──▶│       app       │──▶│      ui       │──▶ Term  │
//! │  │ (session)│   │ (state, events) │   │  (rendering)  │          │
//! │  └──────────┘   └───┬─────────┬───┘   └───────────────┘          │
//! │                     │         │                                  │
//! │                     ▼         ▼                                  │
//! │               ┌──────────┐ ┌──────────┐   ┌──────────┐           │
//! │               │   data   │ │  alert   │──▶│ settings │           │
//! │               │ (charts) │ │ (idle)   │   │ (store)  │           │
//! │               └──────────┘ └──────────┘   └──────────┘           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: The [`DataSource`] trait, the reconnecting [`LiveSource`]
//!   and its [`ConnectionManager`], and an in-memory [`ChannelSource`]
//! - **[`data`]**: [`TimeSeriesBuffer`] (bounded FIFO history) and the
//!   [`ChartProjector`] that turns it into chart points
//! - **[`alert`]**: [`AlertEngine`] with per-device [`MonitorConfig`]s
//! - **[`settings`]**: Persisted monitor configs and UI preferences
//! - **[`config`]**: Layered runtime configuration
//! - **[`ui`]**: Dashboard, devices, and system views rendered with ratatui
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Stream from ws://localhost:8000/ws
//! hostwatch
//!
//! # Another host, newline-delimited JSON over TCP
//! hostwatch --host gpu-box:9000 --transport tcp
//! ```
//!
//! ### As a library with a channel source
//!
//! ```
//! use hostwatch::alert::RecordingNotifier;
//! use hostwatch::settings::{MemoryStore, Preferences, Settings};
//! use hostwatch::{App, ChannelSource, Snapshot};
//!
//! let (tx, source) = ChannelSource::create("example");
//! let prefs = Preferences::open(Box::new(MemoryStore::with(Settings {
//!     dark_mode: Some(true),
//!     ..Settings::default()
//! })));
//! let mut app = App::new(
//!     Box::new(source),
//!     prefs,
//!     Box::new(RecordingNotifier::default()),
//!     60,
//! );
//!
//! let snapshot = Snapshot::from_frame(
//!     r#"{"system":{"cpu":25,"memory":{"percent":50},"network":{}},"gpus":[]}"#,
//! )
//! .unwrap();
//! tx.send_snapshot(snapshot);
//!
//! assert_eq!(app.poll_source(), 1);
//! assert_eq!(app.buffer.len(), 1);
//! ```
//!
//! ### Driving the alert engine directly
//!
//! ```
//! use std::time::Instant;
//! use hostwatch::alert::{AlertEngine, MonitorConfig, MonitorConfigs, RecordingSink};
//! use hostwatch::source::DeviceId;
//! use hostwatch::Snapshot;
//!
//! let mut configs = MonitorConfigs::new();
//! configs.insert(DeviceId::Index(0), MonitorConfig::enabled(10.0, 0));
//! let mut engine = AlertEngine::new(configs);
//!
//! let snapshot = Snapshot::from_frame(
//!     r#"{"system":{"cpu":1,"memory":{"percent":1},"network":{}},
//!         "gpus":[{"id":0,"name":"GPU0","gpu_util":0,"mem_percent":5}]}"#,
//! )
//! .unwrap();
//!
//! let mut sink = RecordingSink::default();
//! let fired = engine.evaluate(&snapshot, Instant::now(), &mut sink);
//! assert_eq!(fired.len(), 1);
//! assert!(!engine.config(&DeviceId::Index(0)).unwrap().enabled);
//! ```

pub mod alert;
pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod settings;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use alert::{AlertEngine, AlertEpisode, AlertSink, MonitorConfig, MonitorConfigs};
pub use app::App;
pub use config::DashboardConfig;
pub use data::{ChartModel, ChartProjector, TimeSeriesBuffer};
pub use source::{
    ChannelSource, ConnectionManager, ConnectionState, DataSource, DeviceId, LiveSource, Snapshot,
};
