//! Bounded sliding-window history for the charts.
//!
//! Turns the unbounded snapshot stream into fixed-size series: one shared
//! timeline (labels plus CPU, memory, and network series, always equal in
//! length) and one series per device, created on first sighting.

use std::collections::VecDeque;

use chrono::{Local, NaiveTime};

use crate::source::{DeviceId, Snapshot};

/// Default number of samples kept per series (one minute at one tick per second).
pub const DEFAULT_CAPACITY: usize = 60;

/// Fixed-capacity FIFO series of scalar samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl TimeSeries {
    /// Create an empty series. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest one first when full.
    ///
    /// Returns the evicted sample, if any.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Copy the samples into a contiguous vector, oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

/// All chart history for a session.
///
/// Device series are kept for the whole session even after a device stops
/// reporting; they are bounded individually and do not have to line up with
/// the shared timeline.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    capacity: usize,
    labels: VecDeque<String>,
    cpu: TimeSeries,
    memory: TimeSeries,
    net_sent: TimeSeries,
    net_recv: TimeSeries,
    /// In order of first sighting, which keeps chart colors stable.
    devices: Vec<(DeviceId, TimeSeries)>,
}

impl Default for TimeSeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TimeSeriesBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            labels: VecDeque::with_capacity(capacity),
            cpu: TimeSeries::new(capacity),
            memory: TimeSeries::new(capacity),
            net_sent: TimeSeries::new(capacity),
            net_recv: TimeSeries::new(capacity),
            devices: Vec::new(),
        }
    }

    /// Append one snapshot, labelled with the current local wall-clock time.
    pub fn append(&mut self, snapshot: &Snapshot) {
        self.append_at(snapshot, Local::now().time());
    }

    /// Append one snapshot with an explicit label time.
    pub fn append_at(&mut self, snapshot: &Snapshot, time: NaiveTime) {
        let label = time.format("%H:%M:%S").to_string();

        // The aligned series share the label count, so they evict together
        if self.labels.len() >= self.capacity {
            self.labels.pop_front();
        }
        self.labels.push_back(label);

        let system = &snapshot.system;
        self.cpu.push(system.cpu_percent);
        self.memory.push(system.memory.percent);
        self.net_sent.push(system.network.sent_bytes_per_sec);
        self.net_recv.push(system.network.recv_bytes_per_sec);

        for device in &snapshot.devices {
            let capacity = self.capacity;
            let index = match self.devices.iter().position(|(id, _)| id == &device.id) {
                Some(index) => index,
                None => {
                    self.devices.push((device.id.clone(), TimeSeries::new(capacity)));
                    self.devices.len() - 1
                }
            };
            self.devices[index].1.push(device.utilization_percent);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries on the shared timeline.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `HH:MM:SS` labels, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.iter().map(String::as_str)
    }

    pub fn cpu(&self) -> &TimeSeries {
        &self.cpu
    }

    pub fn memory(&self) -> &TimeSeries {
        &self.memory
    }

    /// Upload throughput in bytes per second.
    pub fn net_sent(&self) -> &TimeSeries {
        &self.net_sent
    }

    /// Download throughput in bytes per second.
    pub fn net_recv(&self) -> &TimeSeries {
        &self.net_recv
    }

    /// Utilization history of a device, if it has ever been seen.
    pub fn device(&self, id: &DeviceId) -> Option<&TimeSeries> {
        self.devices.iter().find(|(d, _)| d == id).map(|(_, s)| s)
    }

    /// Every device seen this session, in order of first sighting.
    pub fn devices(&self) -> impl Iterator<Item = (&DeviceId, &TimeSeries)> + '_ {
        self.devices.iter().map(|(id, series)| (id, series))
    }
}
