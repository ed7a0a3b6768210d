//! Per-metric summary statistics over a reading set.

use serde::{Deserialize, Serialize};

use super::reading::{Metric, Reading};

/// Average, minimum and maximum of one metric. All zero for an empty input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Number of samples
    pub count: usize,
}

/// Summarize `metric` over `readings` at full precision.
pub fn stats(readings: &[Reading], metric: Metric) -> Stats {
    if readings.is_empty() {
        return Stats::default();
    }

    let (sum, min, max) = readings.iter().map(|r| r.value(metric)).fold(
        (0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(sum, min, max), v| (sum + v, min.min(v), max.max(v)),
    );

    Stats {
        avg: sum / readings.len() as f64,
        min,
        max,
        count: readings.len(),
    }
}

/// Stats for all three metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub temperature: Stats,
    pub humidity: Stats,
    pub light_level: Stats,
}

impl MetricStats {
    pub fn compute(readings: &[Reading]) -> Self {
        Self {
            temperature: stats(readings, Metric::Temperature),
            humidity: stats(readings, Metric::Humidity),
            light_level: stats(readings, Metric::LightLevel),
        }
    }

    pub fn get(&self, metric: Metric) -> Stats {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::LightLevel => self.light_level,
        }
    }
}
