//! System view rendering: memory totals, disks, and network counters.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
    Frame,
};

use super::devices::usage_bar;
use crate::app::App;
use crate::data::units::format_rate;

/// Render the System view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref snapshot) = app.latest else {
        return;
    };
    let system = &snapshot.system;

    let [top, disks_area] =
        Layout::vertical([Constraint::Length(6), Constraint::Min(3)]).areas(area);
    let [memory_area, network_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);

    let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let label = |s: &'static str| Span::styled(s, Style::default().add_modifier(Modifier::DIM));

    let memory = Paragraph::new(vec![
        Line::from(vec![
            label(" Usage      "),
            Span::styled(
                format!("{} {:.1}%", usage_bar(system.memory.percent), system.memory.percent),
                app.theme.usage_style(system.memory.percent),
            ),
        ]),
        Line::from(vec![label(" Used       "), Span::raw(dash(&system.memory.used))]),
        Line::from(vec![label(" Available  "), Span::raw(dash(&system.memory.available))]),
        Line::from(vec![label(" Total      "), Span::raw(dash(&system.memory.total))]),
    ])
    .block(panel(app, " Memory "));
    frame.render_widget(memory, memory_area);

    let net = &system.network;
    let network = Paragraph::new(vec![
        Line::from(vec![label(" ↓ Rate     "), Span::raw(format_rate(net.recv_bytes_per_sec))]),
        Line::from(vec![label(" ↑ Rate     "), Span::raw(format_rate(net.sent_bytes_per_sec))]),
        Line::from(vec![label(" ↓ Total    "), Span::raw(dash(&net.bytes_recv))]),
        Line::from(vec![label(" ↑ Total    "), Span::raw(dash(&net.bytes_sent))]),
    ])
    .block(panel(app, " Network "));
    frame.render_widget(network, network_area);

    let header = Row::new(vec!["Device", "Mount", "Used", "Total", "Usage"])
        .height(1)
        .style(app.theme.header);
    let rows: Vec<Row> = system
        .disks
        .iter()
        .map(|disk| {
            Row::new(vec![
                Line::from(disk.device.as_str()),
                Line::from(disk.mountpoint.as_str()),
                Line::from(dash(&disk.used)),
                Line::from(dash(&disk.total)),
                Line::from(Span::styled(
                    format!("{} {:.1}%", usage_bar(disk.percent), disk.percent),
                    app.theme.usage_style(disk.percent),
                )),
            ])
        })
        .collect();
    let widths = [
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(18),
    ];
    let disks = Table::new(rows, widths)
        .header(header)
        .block(panel(app, " Disks "));
    frame.render_widget(disks, disks_area);
}

fn panel<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}
