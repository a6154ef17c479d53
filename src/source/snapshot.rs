//! Wire types for metric snapshots.
//!
//! These types match the JSON frames pushed by the metrics producer once per
//! sampling tick. Only the fields the pipeline depends on are required; the
//! rest are optional so a leaner producer never makes a frame malformed.
//! Unknown fields are ignored.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One point-in-time reading of the host and its accelerator devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Host-level CPU, memory, and network figures.
    pub system: SystemReading,

    /// Accelerator readings. May be empty, absent, or `null`.
    #[serde(
        default,
        rename = "gpus",
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub devices: Vec<DeviceReading>,

    /// Producer-side Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Snapshot {
    /// Parse a single text frame.
    pub fn from_frame(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }
}

/// Host-level block of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemReading {
    /// Overall CPU utilization in percent.
    #[serde(rename = "cpu")]
    pub cpu_percent: f64,

    pub memory: MemoryReading,

    pub network: NetworkReading,

    /// Mounted partitions, when the producer reports them.
    #[serde(
        default,
        rename = "disk",
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub disks: Vec<DiskReading>,
}

/// Host memory figures.
///
/// The size fields arrive pre-formatted by the producer (e.g. `"15.42GB"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<String>,
}

/// Network throughput, in raw bytes per second.
///
/// Missing rates are read as zero. Unit scaling is a display concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReading {
    #[serde(rename = "speed_sent_bytes", default)]
    pub sent_bytes_per_sec: f64,
    #[serde(rename = "speed_recv_bytes", default)]
    pub recv_bytes_per_sec: f64,
    /// Cumulative bytes sent since boot, pre-formatted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_sent: Option<String>,
    /// Cumulative bytes received since boot, pre-formatted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_recv: Option<String>,
}

/// Usage of one mounted partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskReading {
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub mountpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<String>,
    pub percent: f64,
}

/// Reading for a single accelerator device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub id: DeviceId,
    pub name: String,

    /// Compute utilization in percent.
    #[serde(rename = "gpu_util")]
    pub utilization_percent: f64,

    /// Share of device memory in use, in percent. This is the figure idle
    /// monitoring compares against.
    #[serde(rename = "mem_percent")]
    pub memory_percent: f64,

    /// Owners of the processes currently running on the device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    /// Memory controller utilization in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_util: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_used: Option<String>,
    /// Current draw in watts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_usage: Option<f64>,
    /// Enforced power limit in watts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_limit: Option<f64>,
    /// Core temperature in degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Stable identifier of an accelerator within a session.
///
/// Producers send either a numeric index or a string. Both forms are
/// accepted, and a string that parses as an unsigned integer is treated as
/// the numeric form, so `0` and `"0"` name the same device. This also makes
/// ids round-trip through JSON object keys, which are always strings.
///
/// Numeric ids order numerically and sort before named ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceId {
    Index(u64),
    Name(String),
}

impl DeviceId {
    fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) => DeviceId::Index(n),
            Err(_) => DeviceId::Name(s.to_string()),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Index(n) => write!(f, "{}", n),
            DeviceId::Name(s) => f.write_str(s),
        }
    }
}

impl From<u64> for DeviceId {
    fn from(n: u64) -> Self {
        DeviceId::Index(n)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        DeviceId::parse(s)
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeviceId::Index(n) => serializer.serialize_u64(*n),
            DeviceId::Name(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DeviceIdVisitor)
    }
}

struct DeviceIdVisitor;

impl<'de> Visitor<'de> for DeviceIdVisitor {
    type Value = DeviceId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a device id (non-negative integer or string)")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<DeviceId, E> {
        Ok(DeviceId::Index(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<DeviceId, E> {
        u64::try_from(v)
            .map(DeviceId::Index)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<DeviceId, E> {
        Ok(DeviceId::parse(v))
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
