//! Parsing and formatting of durations, byte counts, and throughput.
//!
//! Buffers always hold raw values; everything here is presentation.

use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to milliseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("s", 1_000.0),
    ("m", 60_000.0),
    ("h", 3_600_000.0),
];

/// Usage percentage at or above which a value is shown as critical.
pub const CRITICAL_PERCENT: f64 = 90.0;

/// Usage percentage at or above which a value is shown as a warning.
pub const WARNING_PERCENT: f64 = 70.0;

/// Parse duration strings like "3s", "500ms", "1.5m".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            return from_millis(val_str, *multiplier, s);
        }
    }

    from_millis(s, 1_000.0, s)
}

fn from_millis(value: &str, multiplier: f64, original: &str) -> Result<Duration> {
    let val: f64 = match value.trim().parse() {
        Ok(val) => val,
        Err(_) => bail!("Unknown duration format: {}", original),
    };
    if !val.is_finite() || val < 0.0 {
        bail!("Duration must be a non-negative number: {}", original);
    }
    Ok(Duration::from_micros((val * multiplier * 1_000.0) as u64))
}

/// Format an elapsed time the way alerts report it: "45s", "2m 5s", "1h 3m".
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Format a throughput in bytes per second with B/s, KB/s, or MB/s.
pub fn format_rate(bytes_per_sec: f64) -> String {
    let b = bytes_per_sec.max(0.0);
    if b < 1024.0 {
        format!("{:.0} B/s", b)
    } else if b < 1024.0 * 1024.0 {
        format!("{:.1} KB/s", b / 1024.0)
    } else {
        format!("{:.1} MB/s", b / (1024.0 * 1024.0))
    }
}

/// Color band for a usage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UsageLevel {
    Normal,
    Warning,
    Critical,
}

impl UsageLevel {
    pub fn of(percent: f64) -> Self {
        if percent >= CRITICAL_PERCENT {
            UsageLevel::Critical
        } else if percent >= WARNING_PERCENT {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }
}
