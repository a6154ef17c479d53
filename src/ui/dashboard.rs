//! Dashboard view rendering.
//!
//! Line charts over the shared timeline: CPU and memory, network throughput,
//! and per-device utilization once a device has been reported.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::Line,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use super::theme::rgb;
use crate::app::App;
use crate::data::units::format_rate;
use crate::data::{ChartModel, SeriesView};

/// Render the Dashboard view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.chart.is_empty() {
        let block = chart_block(app, " Dashboard ");
        let waiting = Paragraph::new("Waiting for the first snapshot...")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(block);
        frame.render_widget(waiting, area);
        return;
    }

    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);

    render_usage_chart(frame, app, left);
    render_network_chart(frame, app, right);

    if app.device_chart.is_initialized() {
        render_device_chart(frame, app, bottom);
    } else {
        let hint = Paragraph::new("No devices reported")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .block(chart_block(app, " Devices "));
        frame.render_widget(hint, bottom);
    }
}

fn render_usage_chart(frame: &mut Frame, app: &App, area: Rect) {
    let model = &app.chart;
    let datasets = vec![dataset(&model.cpu), dataset(&model.memory)];

    let chart = Chart::new(datasets)
        .block(chart_block(app, " CPU / Memory "))
        .x_axis(time_axis(app, model))
        .y_axis(percent_axis(app));

    frame.render_widget(chart, area);
}

fn render_network_chart(frame: &mut Frame, app: &App, area: Rect) {
    let model = &app.chart;
    let datasets = vec![dataset(&model.net_down), dataset(&model.net_up)];

    // Leave headroom above the peak; never collapse to a zero-height axis
    let y_max = (model.net_max() * 1.1).max(1024.0);
    let y_axis = Axis::default()
        .style(Style::default().fg(app.theme.muted))
        .bounds([0.0, y_max])
        .labels(vec![
            Line::from("0"),
            Line::from(format_rate(y_max / 2.0)),
            Line::from(format_rate(y_max)),
        ]);

    let chart = Chart::new(datasets)
        .block(chart_block(app, " Network "))
        .x_axis(time_axis(app, model))
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

fn render_device_chart(frame: &mut Frame, app: &App, area: Rect) {
    let model = &app.chart;
    let datasets: Vec<Dataset> = model.devices.iter().map(|(_, view)| dataset(view)).collect();

    let chart = Chart::new(datasets)
        .block(chart_block(app, " Device Utilization "))
        .x_axis(time_axis(app, model))
        .y_axis(percent_axis(app));

    frame.render_widget(chart, area);
}

fn dataset(view: &SeriesView) -> Dataset<'_> {
    Dataset::default()
        .name(view.label.clone())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(rgb(view.color)))
        .data(&view.points)
}

fn chart_block<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

/// X axis labelled with the oldest and newest sample times.
fn time_axis<'a>(app: &App, model: &'a ChartModel) -> Axis<'a> {
    let first = model.labels.first().map(String::as_str).unwrap_or("");
    let last = model.labels.last().map(String::as_str).unwrap_or("");
    Axis::default()
        .style(Style::default().fg(app.theme.muted))
        .bounds([0.0, model.x_max()])
        .labels(vec![Line::from(first), Line::from(last)])
}

fn percent_axis(app: &App) -> Axis<'static> {
    Axis::default()
        .style(Style::default().fg(app.theme.muted))
        .bounds([0.0, 100.0])
        .labels(vec![Line::from("0%"), Line::from("50%"), Line::from("100%")])
}
