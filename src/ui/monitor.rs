//! Monitor form and notification permission overlays.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::common::centered_rect;
use crate::app::{App, FormField, MonitorForm};

/// Render the monitor form for the device being edited.
pub fn render_form(frame: &mut Frame, app: &App, form: &MonitorForm, area: Rect) {
    let field = |focus: FormField, label: &'static str, value: String| {
        let active = form.focus == focus;
        let marker = if active { "▶ " } else { "  " };
        let value_style = if active {
            app.theme.selected
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::raw(marker),
            Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(value, value_style),
        ])
    };

    let enabled = if form.enabled { "[x] on" } else { "[ ] off" };
    let cursor = |focus: FormField| if form.focus == focus { "_" } else { "" };

    let lines = vec![
        Line::from(Span::styled(
            format!(" {} [ID:{}]", form.device_name, form.device_id),
            app.theme.header,
        )),
        Line::from(""),
        field(FormField::Enabled, "Alert when idle   ", enabled.to_string()),
        field(
            FormField::Threshold,
            "Memory at or below",
            format!(" {}{} %", form.threshold, cursor(FormField::Threshold)),
        ),
        field(
            FormField::Duration,
            "For at least      ",
            format!(" {}{} s", form.duration, cursor(FormField::Duration)),
        ),
        Line::from(""),
        Line::from(Span::styled(
            " Tab:next field  Space:toggle  Enter:save  Esc:cancel",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Idle Monitor ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let form_area = centered_rect(area, 60, 9);
    frame.render_widget(Clear, form_area);
    frame.render_widget(Paragraph::new(lines).block(block), form_area);
}

/// Render the one-time notification permission prompt.
pub fn render_permission_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(" Show desktop notifications when a"),
        Line::from(" monitored device goes idle?"),
        Line::from(""),
        Line::from(Span::styled(
            " y:allow  n:deny",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];

    let block = Block::default()
        .title(" Notifications ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.warning));

    let prompt_area = centered_rect(area, 42, 6);
    frame.render_widget(Clear, prompt_area);
    frame.render_widget(Paragraph::new(lines).block(block), prompt_area);
}
