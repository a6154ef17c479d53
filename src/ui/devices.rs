//! Devices view rendering.
//!
//! One row per reported device with utilization, memory, power, users, and
//! the state of its idle monitor.

use std::time::Instant;

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{App, MonitorStatus};
use crate::data::units::format_elapsed;
use crate::source::DeviceReading;

/// Width of the utilization bar in characters.
const BAR_WIDTH: usize = 10;

/// Render the Devices view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let devices = app.devices();
    let block = Block::default()
        .title(format!(" Devices ({}) [m:monitor] ", devices.len()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if devices.is_empty() {
        let empty = Paragraph::new(" No devices reported by this host")
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec![
        "ID", "Name", "Util", "Mem", "Used/Total", "Temp", "Power", "Users", "Monitor",
    ])
    .height(1)
    .style(app.theme.header);

    let now = Instant::now();
    let rows: Vec<Row> = devices.iter().map(|d| device_row(app, d, now)).collect();

    let widths = [
        Constraint::Length(6),  // ID
        Constraint::Fill(2),    // Name
        Constraint::Length(16), // Util bar + percent
        Constraint::Length(7),  // Mem
        Constraint::Fill(1),    // Used/Total
        Constraint::Length(6),  // Temp
        Constraint::Length(13), // Power
        Constraint::Fill(1),    // Users
        Constraint::Length(20), // Monitor
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(app.selected_device.min(devices.len() - 1)));

    frame.render_stateful_widget(table, area, &mut state);
}

fn device_row<'a>(app: &App, device: &'a DeviceReading, now: Instant) -> Row<'a> {
    let util = device.utilization_percent;
    let util_cell = Line::from(vec![
        Span::styled(usage_bar(util), app.theme.usage_style(util)),
        Span::raw(format!(" {:>3.0}%", util)),
    ]);

    let used_total = match (&device.mem_used, &device.mem_total) {
        (Some(used), Some(total)) => format!("{} / {}", used, total),
        _ => "-".to_string(),
    };
    let temperature = device
        .temperature
        .map(|t| format!("{:.0}°C", t))
        .unwrap_or_else(|| "-".to_string());
    let power = match (device.power_usage, device.power_limit) {
        (Some(usage), Some(limit)) => format!("{:.0}/{:.0} W", usage, limit),
        (Some(usage), None) => format!("{:.0} W", usage),
        _ => "-".to_string(),
    };
    let users = if device.users.is_empty() {
        "-".to_string()
    } else {
        device.users.join(",")
    };

    Row::new(vec![
        Cell::from(device.id.to_string()),
        Cell::from(device.name.as_str()),
        Cell::from(util_cell),
        Cell::from(format!("{:.1}%", device.memory_percent))
            .style(app.theme.usage_style(device.memory_percent)),
        Cell::from(used_total),
        Cell::from(temperature),
        Cell::from(power),
        Cell::from(users),
        monitor_cell(app, device, now),
    ])
}

fn monitor_cell<'a>(app: &App, device: &DeviceReading, now: Instant) -> Cell<'a> {
    let config = app.engine().config(&device.id);
    match app.monitor_status(&device.id, now) {
        MonitorStatus::Off => Cell::from("off").style(Style::default().add_modifier(Modifier::DIM)),
        MonitorStatus::Watching => {
            let threshold = config.map(|c| c.threshold_percent).unwrap_or_default();
            Cell::from(format!("on ≤{}%", threshold)).style(Style::default().fg(app.theme.healthy))
        }
        MonitorStatus::Pending(elapsed) => {
            let sustain = config.map(|c| c.sustain()).unwrap_or_default();
            Cell::from(format!(
                "idle {}/{}",
                format_elapsed(elapsed),
                format_elapsed(sustain)
            ))
            .style(Style::default().fg(app.theme.warning))
        }
    }
}

/// A fixed-width bar, e.g. `████░░░░░░` for 40%.
pub fn usage_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}
