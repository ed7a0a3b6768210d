//! Client-side aggregation core for the environmental sensor dashboard.
//!
//! Data flow: push channel (`channel`) and history pull (`fetch`) feed the
//! `DashboardCore` (`state`), which keeps the history store, applies the selected
//! time window and derives statistics and render-ready views (`adapter`).
//! `runtime` drives all of it on a background tokio runtime.

pub mod adapter;
pub mod channel;
pub mod fetch;
pub mod frame;
pub mod history;
pub mod reading;
pub mod runtime;
pub mod state;
pub mod stats;
pub mod window;

pub use adapter::{
    chart_series, comparison_direction, metric_cards, round_one_decimal, ChartPoint,
    DashboardView, MetricCard, Trend,
};
pub use channel::{supervise, Backoff, ChannelState, IngestionChannel};
pub use fetch::{HistoryClient, HistorySource};
pub use frame::{decode_frame, decode_readings, ChannelEvent};
pub use history::{HistoryStore, StoreOptions};
pub use reading::{
    LiveReadingPolicy, LiveSnapshot, Metric, RawReading, Reading, SensorState, SensorStatus,
};
pub use runtime::{DashboardCommand, DashboardRuntime, RuntimeOptions};
pub use state::{Change, DashboardCore, SubscriptionId};
pub use stats::{stats, MetricStats, Stats};
pub use window::{filter, TimeWindow};
