//! Sliding-window history and chart projection.
//!
//! ## Submodules
//!
//! - [`series`]: Fixed-capacity FIFO series and the per-session [`TimeSeriesBuffer`]
//! - [`projector`]: Stateless transform from buffers to chart points ([`ChartProjector`])
//! - [`units`]: Parsing and formatting of durations, bytes, and throughput
//!
//! ## Data Flow
//!
//! ```text
//! Snapshot
//!    │
//!    ▼
//! TimeSeriesBuffer::append()
//!    │
//!    ▼
//! ChartProjector::project() ──▶ ChartModel (labels + series points)
//! ```

pub mod projector;
pub mod series;
pub mod units;

pub use projector::{ChartModel, ChartProjector, DeviceChartState, Rgb, SeriesView};
pub use series::{TimeSeries, TimeSeriesBuffer, DEFAULT_CAPACITY};
pub use units::UsageLevel;
