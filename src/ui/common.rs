//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::units::format_rate;
use crate::source::ConnectionState;

/// Render the header bar with the connection indicator and current figures.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (indicator_style, state_label) = match app.connection {
        ConnectionState::Connected => (Style::default().fg(app.theme.healthy), "connected"),
        ConnectionState::Connecting => (Style::default().fg(app.theme.warning), "connecting"),
        ConnectionState::Disconnected => (
            Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD),
            "disconnected",
        ),
    };

    let mut spans = vec![
        Span::styled(" ● ", indicator_style),
        Span::styled("HOSTWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(state_label, indicator_style),
    ];

    let Some(ref snapshot) = app.latest else {
        spans.push(Span::raw(" │ Waiting for data..."));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
        return;
    };

    let system = &snapshot.system;
    spans.extend([
        Span::raw(" │ CPU "),
        Span::styled(
            format!("{:.1}%", system.cpu_percent),
            app.theme.usage_style(system.cpu_percent),
        ),
        Span::raw(" │ Mem "),
        Span::styled(
            format!("{:.1}%", system.memory.percent),
            app.theme.usage_style(system.memory.percent),
        ),
        Span::raw(format!(
            " │ ↓ {} ↑ {}",
            format_rate(system.network.recv_bytes_per_sec),
            format_rate(system.network.sent_bytes_per_sec)
        )),
    ]);
    if !snapshot.devices.is_empty() {
        spans.push(Span::raw(format!(" │ {} devices", snapshot.devices.len())));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![
        Line::from(" 1:Dashboard "),
        Line::from(" 2:Devices "),
        Line::from(" 3:System "),
    ];

    let selected = match app.current_view {
        View::Dashboard => 0,
        View::Devices => 1,
        View::System => 2,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// A fired alert takes precedence, then temporary status messages, then the
/// regular source and control summary.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(alert) = app.get_alert_banner() {
        let paragraph = Paragraph::new(format!(" ⚠ {} ", alert)).style(
            Style::default()
                .fg(app.theme.critical)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::Devices => "↑↓:select m:monitor d:theme Tab:switch ?:help q:quit",
        _ => "Tab:switch d:theme ?:help q:quit",
    };

    let status = match (&app.last_error, app.is_connected()) {
        (Some(err), false) => format!(
            " {} | {} | reconnecting | {}",
            app.source_description(),
            err,
            controls
        ),
        _ => match app.last_updated {
            Some(updated) => format!(
                " {} | Updated {:.1}s ago | {}",
                app.source_description(),
                updated.elapsed().as_secs_f64(),
                controls
            ),
            None => format!(" {} | {}", app.source_description(), controls),
        },
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ Tab     Switch views"),
        Line::from("  1 2 3       Jump to view"),
        Line::from("  ↑/↓ j/k     Select device"),
        Line::from(""),
        section(" Monitoring"),
        Line::from("  m / Enter   Edit idle monitor"),
        Line::from("  Space       Toggle enabled (in form)"),
        Line::from("  Tab         Next field (in form)"),
        Line::from("  Enter/Esc   Save/cancel (in form)"),
        Line::from(""),
        section(" General"),
        Line::from("  d           Toggle dark mode"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);
    let help_area = centered_rect(area, 42, 21);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(area, 40, 10), Rect::new(30, 15, 40, 10));

        let small = Rect::new(0, 0, 20, 8);
        let r = centered_rect(small, 40, 10);
        assert!(r.width <= 16 && r.height <= 6);
    }
}
