use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::Reading;

/// Hardening options for the history store. Both are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Stable-sort readings by timestamp on replace
    pub sort_on_replace: bool,
    /// Keep at most this many readings, evicting the oldest first
    pub capacity: Option<usize>,
}

/// Canonical ordered collection of past readings.
///
/// Snapshots are shared `Arc`s: a mutation builds a new vector (or clones on write),
/// so a snapshot handed out earlier never changes underneath its holder.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    readings: Arc<Vec<Reading>>,
    options: StoreOptions,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            readings: Arc::default(),
            options,
        }
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Discard the current contents and install `readings`.
    ///
    /// Invalid readings are dropped; the rest keep their received order unless
    /// `sort_on_replace` is set. Returns the number of readings installed.
    pub fn replace_all(&mut self, readings: Vec<Reading>) -> usize {
        let received = readings.len();
        let mut readings: Vec<Reading> = readings.into_iter().filter(Reading::is_valid).collect();

        if readings.len() < received {
            log::debug!(
                "Dropped {} invalid readings on replace",
                received - readings.len()
            );
        }

        if self.options.sort_on_replace {
            readings.sort_by_key(|r| r.timestamp);
        }

        if let Some(capacity) = self.options.capacity {
            Self::evict_oldest(&mut readings, capacity);
        }

        let installed = readings.len();
        self.readings = Arc::new(readings);
        installed
    }

    /// Add one reading at the end. Returns false if the reading was invalid.
    pub fn append(&mut self, reading: Reading) -> bool {
        if !reading.is_valid() {
            log::debug!("Dropped invalid reading on append");
            return false;
        }

        let readings = Arc::make_mut(&mut self.readings);
        readings.push(reading);

        if let Some(capacity) = self.options.capacity {
            Self::evict_oldest(readings, capacity);
        }
        true
    }

    /// Keep the `capacity` newest readings by timestamp, in their current order.
    /// Among readings sharing the cutoff timestamp the later-received ones stay.
    fn evict_oldest(readings: &mut Vec<Reading>, capacity: usize) {
        if readings.len() <= capacity {
            return;
        }
        if capacity == 0 {
            readings.clear();
            return;
        }

        if readings.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            let excess = readings.len() - capacity;
            readings.drain(..excess);
            return;
        }

        let mut timestamps: Vec<DateTime<Utc>> = readings.iter().map(|r| r.timestamp).collect();
        timestamps.sort_unstable_by(|a, b| b.cmp(a));
        let cutoff = timestamps[capacity - 1];
        let newer = timestamps[..capacity].iter().filter(|t| **t > cutoff).count();

        let mut tie_slots = capacity - newer;
        let mut keep = vec![false; readings.len()];
        for (slot, reading) in keep.iter_mut().zip(readings.iter()).rev() {
            if reading.timestamp > cutoff {
                *slot = true;
            } else if reading.timestamp == cutoff && tie_slots > 0 {
                *slot = true;
                tie_slots -= 1;
            }
        }

        let mut keep = keep.into_iter();
        readings.retain(|_| keep.next().unwrap_or(false));
    }

    /// Read-only shared view of the current contents
    pub fn snapshot(&self) -> Arc<Vec<Reading>> {
        Arc::clone(&self.readings)
    }

    pub fn as_slice(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Earliest and latest timestamps in the store
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.readings.iter().map(|r| r.timestamp).min()?;
        let last = self.readings.iter().map(|r| r.timestamp).max()?;
        Some((first, last))
    }
}
