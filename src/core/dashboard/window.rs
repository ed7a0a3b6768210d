use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::reading::Reading;

/// Inclusive time range used to filter history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Zero-width window at the current instant
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::new(instant, instant)
    }

    /// Window covering `span` up to now
    pub fn last(span: Duration) -> Self {
        let end = Utc::now();
        Self::new(end - span, end)
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// An inverted window matches nothing
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::now()
    }
}

/// Readings with `window.start <= timestamp <= window.end`, in input order.
pub fn filter(readings: &[Reading], window: &TimeWindow) -> Vec<Reading> {
    if window.is_inverted() {
        return Vec::new();
    }

    readings
        .iter()
        .filter(|r| window.contains(r.timestamp))
        .copied()
        .collect()
}
