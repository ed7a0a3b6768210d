//! Bridge from core state to render-ready structures.
//!
//! Renderers consume these types only; no domain rule lives in the view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::channel::ChannelState;
use super::reading::{LiveSnapshot, Metric, Reading, SensorState, SensorStatus};
use super::stats::{MetricStats, Stats};
use super::window::TimeWindow;

/// One chart sample. Timestamps are always `DateTime<Utc>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub light_level: f64,
}

impl ChartPoint {
    /// X coordinate for chart axes
    pub fn x(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::LightLevel => self.light_level,
        }
    }
}

impl From<&Reading> for ChartPoint {
    fn from(reading: &Reading) -> Self {
        Self {
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
            light_level: reading.light_level,
        }
    }
}

/// Values pass through unchanged, in input order.
pub fn chart_series(filtered: &[Reading]) -> Vec<ChartPoint> {
    filtered.iter().map(ChartPoint::from).collect()
}

/// Direction of the live value relative to the window average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

/// `Up` only when strictly above the average; a tie reads as `Down`.
pub fn comparison_direction(current: f64, avg: f64) -> Trend {
    if current > avg {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Display rounding used by metric cards
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Everything a stat card shows for one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCard {
    pub metric: Metric,
    pub title: &'static str,
    pub unit: &'static str,
    pub current: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub trend: Trend,
    pub sensor: &'static str,
    pub sensor_state: SensorState,
}

impl MetricCard {
    pub fn build(metric: Metric, live: &LiveSnapshot, stats: Stats, status: &SensorStatus) -> Self {
        let current = live.value(metric);
        Self {
            metric,
            title: metric.label(),
            unit: metric.unit(),
            current,
            avg: round_one_decimal(stats.avg),
            min: round_one_decimal(stats.min),
            max: round_one_decimal(stats.max),
            // compared against the unrounded average
            trend: comparison_direction(current, stats.avg),
            sensor: metric.sensor(),
            sensor_state: status.get(metric.sensor()),
        }
    }
}

pub fn metric_cards(live: &LiveSnapshot, stats: &MetricStats, status: &SensorStatus) -> Vec<MetricCard> {
    Metric::ALL
        .iter()
        .map(|&metric| MetricCard::build(metric, live, stats.get(metric), status))
        .collect()
}

/// Immutable snapshot of the dashboard, published after each completed event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub live: LiveSnapshot,
    pub status: SensorStatus,
    pub window: TimeWindow,
    pub series: Vec<ChartPoint>,
    pub stats: MetricStats,
    pub cards: Vec<MetricCard>,
    pub connection: ChannelState,
    pub refreshing: bool,
    pub last_error: Option<String>,
    pub store_len: usize,
    pub history_span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Default for DashboardView {
    fn default() -> Self {
        let live = LiveSnapshot::default();
        let stats = MetricStats::default();
        let status = SensorStatus::default();
        Self {
            cards: metric_cards(&live, &stats, &status),
            live,
            status,
            window: TimeWindow::default(),
            series: Vec::new(),
            stats,
            connection: ChannelState::default(),
            refreshing: false,
            last_error: None,
            store_len: 0,
            history_span: None,
        }
    }
}
