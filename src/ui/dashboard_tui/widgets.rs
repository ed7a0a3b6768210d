use chrono::{DateTime, Local};
use ratatui::prelude::*;

use crate::core::dashboard::{ChannelState, ChartPoint, Metric, SensorState, Trend};

/// Line color for each metric's chart and card
pub fn metric_color(metric: Metric) -> Color {
    match metric {
        Metric::Temperature => Color::LightRed,
        Metric::Humidity => Color::Cyan,
        Metric::LightLevel => Color::LightYellow,
    }
}

pub fn connection_color(state: ChannelState) -> Color {
    match state {
        ChannelState::Connected => Color::Green,
        ChannelState::Connecting => Color::Yellow,
        ChannelState::Disconnected => Color::Red,
        ChannelState::Idle | ChannelState::Closed => Color::DarkGray,
    }
}

pub fn trend_span(trend: Trend) -> Span<'static> {
    match trend {
        Trend::Up => Span::styled("▲", Style::default().fg(Color::Green)),
        Trend::Down => Span::styled("▼", Style::default().fg(Color::Red)),
    }
}

pub fn sensor_span(sensor: &str, state: SensorState) -> Span<'static> {
    let color = if state.is_active() {
        Color::Green
    } else {
        Color::DarkGray
    };
    Span::styled(format!("● {} {}", sensor, state), Style::default().fg(color))
}

/// Y-axis bounds with a little headroom so flat lines stay visible
pub fn value_bounds(points: &[ChartPoint], metric: Metric) -> [f64; 2] {
    let (min, max) = points
        .iter()
        .map(|p| p.value(metric))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }

    let pad = ((max - min) * 0.1).max(0.5);
    [min - pad, max + pad]
}

/// X-axis bounds in epoch milliseconds
pub fn time_bounds(points: &[ChartPoint]) -> [f64; 2] {
    let (lo, hi) = points
        .iter()
        .map(ChartPoint::x)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });

    if !lo.is_finite() || !hi.is_finite() {
        [0.0, 1.0]
    } else if lo == hi {
        [lo - 1.0, hi + 1.0]
    } else {
        [lo, hi]
    }
}

/// Axis label for an epoch-millisecond x value, in local time
pub fn time_label(millis: f64) -> String {
    DateTime::from_timestamp_millis(millis as i64)
        .map(|t| t.with_timezone(&Local).format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
