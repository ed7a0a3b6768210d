//! Dashboard core: owns every piece of reading state and applies events to it.
//!
//! All mutation goes through `&mut self`, so one owner (the runtime's orchestrator
//! task, or a test) serializes events. Each completed event notifies subscribers
//! once. Derived data (filtered view and stats) is recomputed whenever the store
//! or the window changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::adapter::{chart_series, metric_cards, ChartPoint, DashboardView};
use super::channel::ChannelState;
use super::fetch::HistorySource;
use super::frame::ChannelEvent;
use super::history::{HistoryStore, StoreOptions};
use super::reading::{LiveSnapshot, Metric, Reading, SensorStatus};
use super::stats::{MetricStats, Stats};
use super::window::{filter, TimeWindow};
use crate::error::Result;

/// What a completed event changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    LiveMetrics,
    SensorStatus,
    History,
    Window,
    Connection,
    Refresh,
}

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(Change) + Send>;

pub struct DashboardCore {
    store: HistoryStore,
    window: TimeWindow,
    live: LiveSnapshot,
    status: SensorStatus,
    connection: ChannelState,
    refreshing: bool,
    last_fetch_error: Option<String>,
    filtered: Vec<Reading>,
    stats: MetricStats,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl DashboardCore {
    pub fn new(options: StoreOptions) -> Self {
        Self::with_window(options, TimeWindow::now())
    }

    pub fn with_window(options: StoreOptions, window: TimeWindow) -> Self {
        Self {
            store: HistoryStore::with_options(options),
            window,
            live: LiveSnapshot::default(),
            status: SensorStatus::default(),
            connection: ChannelState::Idle,
            refreshing: false,
            last_fetch_error: None,
            filtered: Vec::new(),
            stats: MetricStats::default(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Apply one decoded channel event.
    pub fn apply(&mut self, event: ChannelEvent) -> Change {
        let change = match event {
            ChannelEvent::FullHistorySnapshot(readings) => {
                let installed = self.store.replace_all(readings);
                log::debug!("History snapshot installed ({} readings)", installed);
                self.recompute();
                Change::History
            }
            ChannelEvent::LiveReading(live) => {
                self.live = live;
                Change::LiveMetrics
            }
            ChannelEvent::StatusUpdate(status) => {
                self.status = status;
                Change::SensorStatus
            }
        };
        self.notify(change);
        change
    }

    /// Add one reading to the store (incremental push of a historical point)
    pub fn append_reading(&mut self, reading: Reading) -> bool {
        let appended = self.store.append(reading);
        if appended {
            self.recompute();
            self.notify(Change::History);
        }
        appended
    }

    pub fn set_window(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.window = TimeWindow::new(start, end);
        self.recompute();
        self.notify(Change::Window);
    }

    pub fn set_connection(&mut self, state: ChannelState) {
        if self.connection == state {
            return;
        }
        self.connection = state;
        self.notify(Change::Connection);
    }

    /// Mark a pull as in flight
    pub fn begin_refresh(&mut self) {
        self.refreshing = true;
        self.notify(Change::Refresh);
    }

    /// Install the outcome of a pull. On failure the store is left untouched and
    /// the error is handed back to the caller.
    pub fn complete_refresh(&mut self, outcome: Result<Vec<Reading>>) -> Result<usize> {
        self.refreshing = false;

        match outcome {
            Ok(readings) => {
                let installed = self.store.replace_all(readings);
                self.last_fetch_error = None;
                self.recompute();
                self.notify(Change::History);
                Ok(installed)
            }
            Err(e) => {
                log::warn!("History refresh failed: {}", e);
                self.last_fetch_error = Some(e.to_string());
                self.notify(Change::Refresh);
                Err(e)
            }
        }
    }

    /// Pull a full history batch from `source` and install it.
    pub async fn refresh_history<S: HistorySource>(&mut self, source: &S) -> Result<usize> {
        self.begin_refresh();
        let outcome = source.fetch_history().await;
        self.complete_refresh(outcome)
    }

    pub fn current_metrics(&self) -> LiveSnapshot {
        self.live
    }

    pub fn sensor_status(&self) -> &SensorStatus {
        &self.status
    }

    pub fn filtered_readings(&self) -> &[Reading] {
        &self.filtered
    }

    pub fn filtered_series(&self) -> Vec<ChartPoint> {
        chart_series(&self.filtered)
    }

    pub fn stats(&self, metric: Metric) -> Stats {
        self.stats.get(metric)
    }

    pub fn all_stats(&self) -> &MetricStats {
        &self.stats
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn snapshot(&self) -> Arc<Vec<Reading>> {
        self.store.snapshot()
    }

    pub fn history_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.store.time_span()
    }

    pub fn connection(&self) -> ChannelState {
        self.connection
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn last_fetch_error(&self) -> Option<&str> {
        self.last_fetch_error.as_deref()
    }

    /// Render-ready snapshot of the current state
    pub fn view(&self) -> DashboardView {
        DashboardView {
            live: self.live,
            status: self.status.clone(),
            window: self.window,
            series: self.filtered_series(),
            stats: self.stats,
            cards: metric_cards(&self.live, &self.stats, &self.status),
            connection: self.connection,
            refreshing: self.refreshing,
            last_error: self.last_fetch_error.clone(),
            store_len: self.store.len(),
            history_span: self.store.time_span(),
        }
    }

    /// Register `on_change`, called after every completed event.
    pub fn subscribe<F>(&mut self, on_change: F) -> SubscriptionId
    where
        F: FnMut(Change) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(on_change)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, change: Change) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(change);
        }
    }

    fn recompute(&mut self) {
        self.filtered = filter(self.store.as_slice(), &self.window);
        self.stats = MetricStats::compute(&self.filtered);
    }
}

impl Default for DashboardCore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}
