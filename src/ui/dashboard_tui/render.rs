use chrono::Local;
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

use super::app::DashboardApp;
use super::widgets::{
    connection_color, metric_color, sensor_span, time_bounds, time_label, trend_span,
    value_bounds,
};
use crate::core::dashboard::{ChartPoint, DashboardView, Metric, MetricCard};

/// Main render function
pub fn render_ui(frame: &mut Frame, app: &DashboardApp) {
    let area = frame.area();
    let view = &app.view;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Connection, window, store size
            Constraint::Length(6), // Metric cards
            Constraint::Min(9),    // Charts
            Constraint::Length(1), // Footer
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_cards(frame, chunks[1], view);
    render_charts(frame, chunks[2], view);
    render_footer(frame, chunks[3]);

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let view = &app.view;
    let window = view.window;
    let window_label = app.preset.map(|p| p.label()).unwrap_or("custom");

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(
            view.connection.label(),
            Style::default()
                .fg(connection_color(view.connection))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " │ {} ({} → {}) │ {} readings stored ",
            window_label,
            window.start.with_timezone(&Local).format("%m-%d %H:%M"),
            window.end.with_timezone(&Local).format("%m-%d %H:%M"),
            view.store_len
        )),
    ];

    if view.refreshing {
        spans.push(Span::styled("│ refreshing… ", Style::default().fg(Color::Yellow)));
    }
    if let Some(error) = &view.last_error {
        spans.push(Span::styled(
            format!("│ {} ", error),
            Style::default().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .title(" Environmental Sensors ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(connection_color(view.connection)));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_cards(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for (card, column) in view.cards.iter().zip(columns.iter()) {
        render_card(frame, *column, card);
    }
}

fn render_card(frame: &mut Frame, area: Rect, card: &MetricCard) {
    let color = metric_color(card.metric);

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{:.1}{} ", card.current, card.unit),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            trend_span(card.trend),
        ]),
        Line::from(format!(
            "avg {:.1}  min {:.1}  max {:.1}",
            card.avg, card.min, card.max
        ))
        .style(Style::default().fg(Color::Gray)),
        Line::from(sensor_span(card.sensor, card.sensor_state)),
    ];

    let block = Block::default()
        .title(format!(" {} ", card.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_charts(frame: &mut Frame, area: Rect, view: &DashboardView) {
    if view.series.is_empty() {
        let block = Block::default().title(" History ").borders(Borders::ALL);
        let message = Paragraph::new("No historical data available")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(message, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for (metric, row) in Metric::ALL.iter().zip(rows.iter()) {
        render_metric_chart(frame, *row, &view.series, *metric);
    }
}

fn render_metric_chart(frame: &mut Frame, area: Rect, series: &[ChartPoint], metric: Metric) {
    let data: Vec<(f64, f64)> = series.iter().map(|p| (p.x(), p.value(metric))).collect();
    let [x_min, x_max] = time_bounds(series);
    let [y_min, y_max] = value_bounds(series, metric);

    let dataset = Dataset::default()
        .name(metric.label())
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(metric_color(metric)))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title(format!(" {} {} ", metric.label(), metric.unit()))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([x_min, x_max])
                .labels(vec![time_label(x_min), time_label(x_max)]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([y_min, y_max])
                .labels(vec![format!("{:.1}", y_min), format!("{:.1}", y_max)]),
        );

    frame.render_widget(chart, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let help = " q: Quit │ ?: Help │ r: Refresh │ 1-4: Window ";
    let para = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(para, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = r#"
    envdash - Help

    Keyboard Shortcuts:
    ─────────────────────────────────────
    q / Esc     Quit the application
    ? / h       Toggle this help screen
    r           Pull the full history again
    1           Window: last hour
    2           Window: last 24 hours
    3           Window: last 7 days
    4           Window: all stored history

    ▲ / ▼ compare the live value to the window average

    Press any key to close this help
    "#;

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::DarkGray));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(paragraph, popup_area);
}

/// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
