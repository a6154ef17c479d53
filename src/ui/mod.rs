//! Terminal UI rendering using ratatui.
//!
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`dashboard`]: Line charts for CPU/memory, network, and device utilization
//! - [`devices`]: Per-device table with monitor status
//! - [`system`]: Memory totals, disk usage, and network counters
//! - [`monitor`]: Monitor form and notification permission overlays
//! - [`common`]: Shared components (header, tabs, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (dashboard/devices/system::render)   │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - monitor::render_form
//!    - monitor::render_permission_prompt
//!    - common::render_help
//! ```

pub mod common;
pub mod dashboard;
pub mod devices;
pub mod monitor;
pub mod system;
pub mod theme;

pub use theme::Theme;
