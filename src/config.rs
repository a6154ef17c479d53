//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`hostwatch.toml` in the working directory, or the file given with
//! `--config`), then `HOSTWATCH_*` environment variables. Command-line flags
//! are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::alert::DEFAULT_NOTIFY_COMMAND;
use crate::data::units::parse_duration;
use crate::data::DEFAULT_CAPACITY;
use crate::source::{Endpoint, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY};

/// Base name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hostwatch";

/// How the streaming session is carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// One JSON text message per tick over WebSocket.
    #[default]
    Websocket,
    /// Newline-delimited JSON over plain TCP.
    Tcp,
}

/// Resolved dashboard configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// `host[:port]` of the metrics producer.
    pub host: String,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    /// WebSocket request path.
    pub path: String,
    pub transport: Transport,
    #[serde(deserialize_with = "deserialize_duration")]
    pub reconnect_delay: Duration,
    /// Longest a single connect attempt may take.
    #[serde(deserialize_with = "deserialize_duration")]
    pub connect_timeout: Duration,
    /// Samples kept per chart series.
    pub history: usize,
    /// Settings file; defaults to the user config directory.
    pub settings_path: Option<PathBuf>,
    /// Program run as `<command> <title> <body>` for desktop notifications.
    pub notify_command: String,
    /// Ring the terminal bell when an alert fires.
    pub bell: bool,
    /// Write logs here. Nothing is logged when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".to_string(),
            secure: false,
            path: "/ws".to_string(),
            transport: Transport::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            history: DEFAULT_CAPACITY,
            settings_path: None,
            notify_command: DEFAULT_NOTIFY_COMMAND.to_string(),
            bell: true,
            log_file: None,
        }
    }
}

impl DashboardConfig {
    /// Load defaults, the config file, and the environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: Self = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("HOSTWATCH").separator("__"))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history == 0 {
            bail!("history must be at least 1");
        }
        if self.reconnect_delay.is_zero() {
            bail!("reconnect_delay must be greater than zero");
        }
        if self.connect_timeout.is_zero() {
            bail!("connect_timeout must be greater than zero");
        }
        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.secure, self.path.clone())
    }

    /// The configured settings file, or the per-user default.
    pub fn settings_path(&self) -> PathBuf {
        self.settings_path.clone().unwrap_or_else(default_settings_path)
    }
}

/// `$XDG_CONFIG_HOME/hostwatch/settings.json`, falling back to `~/.config`
/// and finally the working directory.
pub fn default_settings_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));

    match base {
        Some(base) => base.join("hostwatch").join("settings.json"),
        None => PathBuf::from("hostwatch-settings.json"),
    }
}

/// Accept `"3s"`-style strings as well as plain numbers of seconds.
fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        Raw::Seconds(secs) => Err(serde::de::Error::custom(format!(
            "invalid duration: {}",
            secs
        ))),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
