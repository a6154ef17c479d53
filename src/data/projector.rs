//! Projection of the sliding-window buffers into chart-ready data.
//!
//! The projector is stateless: it reads a [`TimeSeriesBuffer`] and produces a
//! [`ChartModel`] of `(x, y)` points that the chart widgets consume directly.
//! The x axis is the position on the shared timeline.

use crate::source::{DeviceId, Snapshot};

use super::series::{TimeSeries, TimeSeriesBuffer};

/// An RGB color, kept free of any rendering library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const CPU_COLOR: Rgb = Rgb(0x3b, 0x82, 0xf6);
pub const MEMORY_COLOR: Rgb = Rgb(0xa8, 0x55, 0xf7);
pub const NET_DOWN_COLOR: Rgb = Rgb(0x10, 0xb9, 0x81);
pub const NET_UP_COLOR: Rgb = Rgb(0x3b, 0x82, 0xf6);

/// Device series colors, assigned by device position and rotated when
/// there are more devices than entries.
pub const DEVICE_PALETTE: [Rgb; 4] = [
    Rgb(0x10, 0xb9, 0x81),
    Rgb(0xf5, 0x9e, 0x0b),
    Rgb(0xef, 0x44, 0x44),
    Rgb(0x3b, 0x82, 0xf6),
];

/// Color for the device at `position` in first-sighting order.
pub fn device_color(position: usize) -> Rgb {
    DEVICE_PALETTE[position % DEVICE_PALETTE.len()]
}

/// One plotted series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesView {
    pub label: String,
    pub color: Rgb,
    pub points: Vec<(f64, f64)>,
}

impl SeriesView {
    /// Largest y value, or 0 for an empty series.
    pub fn max(&self) -> f64 {
        self.points.iter().map(|(_, y)| *y).fold(0.0, f64::max)
    }
}

/// Everything the dashboard charts need for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartModel {
    /// `HH:MM:SS` labels of the shared timeline, oldest first.
    pub labels: Vec<String>,
    pub cpu: SeriesView,
    pub memory: SeriesView,
    pub net_down: SeriesView,
    pub net_up: SeriesView,
    /// One series per known device, in first-sighting order.
    pub devices: Vec<(DeviceId, SeriesView)>,
}

impl ChartModel {
    /// Width of the x axis.
    pub fn x_max(&self) -> f64 {
        self.labels.len().saturating_sub(1).max(1) as f64
    }

    /// Upper bound for the network chart's y axis, in bytes per second.
    pub fn net_max(&self) -> f64 {
        self.net_down.max().max(self.net_up.max())
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Stateless buffer-to-chart transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartProjector;

impl ChartProjector {
    /// Build the chart model for the current buffer contents.
    pub fn project(buffer: &TimeSeriesBuffer) -> ChartModel {
        let width = buffer.len();

        let devices = buffer
            .devices()
            .enumerate()
            .map(|(position, (id, series))| {
                let view = series_view(&format!("GPU {}", id), device_color(position), series, width);
                (id.clone(), view)
            })
            .collect();

        ChartModel {
            labels: buffer.labels().map(str::to_string).collect(),
            cpu: series_view("CPU", CPU_COLOR, buffer.cpu(), width),
            memory: series_view("Memory", MEMORY_COLOR, buffer.memory(), width),
            net_down: series_view("Down", NET_DOWN_COLOR, buffer.net_recv(), width),
            net_up: series_view("Up", NET_UP_COLOR, buffer.net_sent(), width),
            devices,
        }
    }
}

/// Right-align a series on the timeline so its newest sample lines up with
/// the newest label.
fn series_view(label: &str, color: Rgb, series: &TimeSeries, width: usize) -> SeriesView {
    let offset = width.saturating_sub(series.len());
    SeriesView {
        label: label.to_string(),
        color,
        points: series
            .iter()
            .enumerate()
            .map(|(i, v)| ((offset + i) as f64, v))
            .collect(),
    }
}

/// Lifecycle of the device chart.
///
/// The chart is only built once a snapshot has reported at least one device;
/// hosts without devices never show it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceChartState {
    #[default]
    Uninitialized,
    Initialized,
}

impl DeviceChartState {
    /// Advance on a newly applied snapshot. Returns `true` on the transition.
    pub fn observe(&mut self, snapshot: &Snapshot) -> bool {
        if *self == DeviceChartState::Uninitialized && !snapshot.devices.is_empty() {
            *self = DeviceChartState::Initialized;
            return true;
        }
        false
    }

    pub fn is_initialized(&self) -> bool {
        *self == DeviceChartState::Initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn snapshot(cpu: f64, devices: &[(u64, f64)]) -> Snapshot {
        let gpus: Vec<String> = devices
            .iter()
            .map(|(id, util)| {
                format!(
                    r#"{{"id":{},"name":"GPU","gpu_util":{},"mem_percent":0}}"#,
                    id, util
                )
            })
            .collect();
        Snapshot::from_frame(&format!(
            r#"{{"system":{{"cpu":{},"memory":{{"percent":40}},"network":{{"speed_sent_bytes":100,"speed_recv_bytes":2000}}}},"gpus":[{}]}}"#,
            cpu,
            gpus.join(",")
        ))
        .unwrap()
    }

    fn at(tick: u32) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(tick, 0).unwrap()
    }

    #[test]
    fn test_empty_buffer_projects_empty_model() {
        let model = ChartProjector::project(&TimeSeriesBuffer::new(10));
        assert!(model.is_empty());
        assert!(model.devices.is_empty());

        // Fixed series keep their label and color with no points yet
        assert_eq!(model.cpu.label, "CPU");
        assert_eq!(model.memory.color, MEMORY_COLOR);
        assert!(model.cpu.points.is_empty());
        assert!(model.net_up.points.is_empty());
        assert_eq!(model.net_max(), 0.0);
        assert_eq!(model.x_max(), 1.0);
    }

    #[test]
    fn test_fixed_series_follow_timeline() {
        let mut buffer = TimeSeriesBuffer::new(10);
        buffer.append_at(&snapshot(10.0, &[]), at(0));
        buffer.append_at(&snapshot(20.0, &[]), at(1));

        let model = ChartProjector::project(&buffer);
        assert_eq!(model.labels, vec!["00:00:00", "00:00:01"]);

        let cpu = &model.cpu;
        assert_eq!(cpu.label, "CPU");
        assert_eq!(cpu.color, CPU_COLOR);
        assert_eq!(cpu.points, vec![(0.0, 10.0), (1.0, 20.0)]);

        assert_eq!(model.net_down.label, "Down");
        assert_eq!(model.net_up.points, vec![(0.0, 100.0), (1.0, 100.0)]);
        assert_eq!(model.net_max(), 2000.0);
        assert_eq!(model.x_max(), 1.0);
    }

    #[test]
    fn test_late_device_is_right_aligned() {
        let mut buffer = TimeSeriesBuffer::new(10);
        buffer.append_at(&snapshot(1.0, &[]), at(0));
        buffer.append_at(&snapshot(1.0, &[]), at(1));
        buffer.append_at(&snapshot(1.0, &[(0, 55.0)]), at(2));

        let model = ChartProjector::project(&buffer);
        let (id, view) = &model.devices[0];
        assert_eq!(id, &DeviceId::Index(0));
        assert_eq!(view.label, "GPU 0");
        assert_eq!(view.points, vec![(2.0, 55.0)]);
    }

    #[test]
    fn test_device_colors_rotate_by_position() {
        let mut buffer = TimeSeriesBuffer::new(10);
        let devices: Vec<(u64, f64)> = (0..6).map(|i| (i, 1.0)).collect();
        buffer.append_at(&snapshot(1.0, &devices), at(0));

        let model = ChartProjector::project(&buffer);
        let colors: Vec<Rgb> = model.devices.iter().map(|(_, v)| v.color).collect();
        assert_eq!(&colors[..4], &DEVICE_PALETTE[..]);
        assert_eq!(colors[4], DEVICE_PALETTE[0]);
        assert_eq!(colors[5], DEVICE_PALETTE[1]);
    }

    #[test]
    fn test_projection_is_pure() {
        let mut buffer = TimeSeriesBuffer::new(10);
        buffer.append_at(&snapshot(5.0, &[(1, 3.0)]), at(0));
        assert_eq!(
            ChartProjector::project(&buffer),
            ChartProjector::project(&buffer)
        );
    }

    #[test]
    fn test_device_chart_initializes_on_first_device() {
        let mut state = DeviceChartState::default();
        assert!(!state.observe(&snapshot(1.0, &[])));
        assert!(!state.is_initialized());

        assert!(state.observe(&snapshot(1.0, &[(0, 1.0)])));
        assert!(state.is_initialized());

        // Later snapshots, with or without devices, keep it initialized
        assert!(!state.observe(&snapshot(1.0, &[])));
        assert!(state.is_initialized());
    }
}
