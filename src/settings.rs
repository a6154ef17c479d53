//! Persisted user preferences.
//!
//! Monitor configs, the theme choice, and the notification permission live in
//! one JSON document that is read at startup and rewritten in full on every
//! change.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alert::MonitorConfigs;

/// Whether desktop notifications may be shown.
///
/// Starts out undecided; the user is asked once, the first time they enable
/// a monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    #[default]
    Default,
    Granted,
    Denied,
}

impl NotificationPermission {
    pub fn is_granted(self) -> bool {
        self == NotificationPermission::Granted
    }

    pub fn is_undecided(self) -> bool {
        self == NotificationPermission::Default
    }
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub monitors: MonitorConfigs,

    /// `None` follows the terminal background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,

    #[serde(default)]
    pub notification_permission: NotificationPermission,
}

/// Where settings are kept.
pub trait SettingsStore: Send + Debug {
    /// Read the stored settings. A store with nothing saved yet returns defaults.
    fn load(&self) -> Result<Settings>;

    /// Replace the stored settings.
    fn save(&mut self, settings: &Settings) -> Result<()>;
}

/// Settings in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // Write then rename so a crash never leaves half a document behind
        let json = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Settings kept in memory, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Vec<Settings>>>,
}

impl MemoryStore {
    /// A store that already holds `settings`.
    pub fn with(settings: Settings) -> Self {
        Self {
            saved: Arc::new(Mutex::new(vec![settings])),
        }
    }

    /// The most recently saved settings.
    pub fn latest(&self) -> Option<Settings> {
        self.saved.lock().ok()?.last().cloned()
    }

    /// Number of documents held, including the initial one.
    pub fn writes(&self) -> usize {
        self.saved.lock().map(|saved| saved.len()).unwrap_or(0)
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.latest().unwrap_or_default())
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        self.saved
            .lock()
            .map_err(|_| anyhow!("settings store poisoned"))?
            .push(settings.clone());
        Ok(())
    }
}

/// Loaded settings together with the store that persists them.
#[derive(Debug)]
pub struct Preferences {
    settings: Settings,
    store: Box<dyn SettingsStore>,
}

impl Preferences {
    /// Load from `store`. Unreadable settings are logged and replaced by
    /// defaults; the store is left untouched until the next change.
    pub fn open(store: Box<dyn SettingsStore>) -> Self {
        let settings = match store.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "ignoring unreadable settings");
                Settings::default()
            }
        };
        Self { settings, store }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn permission(&self) -> NotificationPermission {
        self.settings.notification_permission
    }

    pub fn set_permission(&mut self, permission: NotificationPermission) -> Result<()> {
        self.settings.notification_permission = permission;
        self.save()
    }

    pub fn dark_mode(&self) -> Option<bool> {
        self.settings.dark_mode
    }

    pub fn set_dark_mode(&mut self, dark: bool) -> Result<()> {
        self.settings.dark_mode = Some(dark);
        self.save()
    }

    /// Replace the stored monitor configs with `monitors` and write everything.
    pub fn save_monitors(&mut self, monitors: &MonitorConfigs) -> Result<()> {
        self.settings.monitors = monitors.clone();
        self.save()
    }

    fn save(&mut self) -> Result<()> {
        self.store.save(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MonitorConfig;
    use crate::source::DeviceId;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_file_round_trip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut store = JsonFileStore::new(&path);

        let mut settings = Settings {
            dark_mode: Some(false),
            notification_permission: NotificationPermission::Granted,
            ..Settings::default()
        };
        settings
            .monitors
            .insert(DeviceId::Index(0), MonitorConfig::enabled(15.0, 30));
        store.save(&settings).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_document_layout() {
        let json = r#"{
            "monitors": {"0": {"enabled": true, "threshold": 10, "duration": 0},
                         "mig-1": {"enabled": false, "threshold": 5, "duration": 60}},
            "dark_mode": true,
            "notification_permission": "denied"
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.monitors.len(), 2);
        assert_eq!(
            settings.monitors[&DeviceId::Index(0)],
            MonitorConfig::enabled(10.0, 0)
        );
        assert!(!settings.monitors[&DeviceId::from("mig-1")].enabled);
        assert_eq!(settings.dark_mode, Some(true));
        assert_eq!(settings.notification_permission, NotificationPermission::Denied);
    }

    #[test]
    fn test_empty_document_is_default() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.notification_permission.is_undecided());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let prefs = Preferences::open(Box::new(JsonFileStore::new(&path)));
        assert_eq!(prefs.settings(), &Settings::default());
        // Left in place for the user to inspect
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_every_change_rewrites_whole_document() {
        let store = MemoryStore::default();
        let mut prefs = Preferences::open(Box::new(store.clone()));

        let mut monitors = MonitorConfigs::new();
        monitors.insert(DeviceId::Index(1), MonitorConfig::enabled(20.0, 10));
        prefs.save_monitors(&monitors).unwrap();
        prefs.set_dark_mode(true).unwrap();
        prefs.set_permission(NotificationPermission::Granted).unwrap();

        assert_eq!(store.writes(), 3);
        let latest = store.latest().unwrap();
        assert_eq!(latest.monitors, monitors);
        assert_eq!(latest.dark_mode, Some(true));
        assert!(latest.notification_permission.is_granted());
    }
}
