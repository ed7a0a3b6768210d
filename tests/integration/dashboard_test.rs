use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use envdash::core::dashboard::{
    decode_frame, filter, Change, ChannelEvent, DashboardCore, HistorySource, LiveReadingPolicy,
    LiveSnapshot, Metric, Reading, SensorState, StoreOptions, TimeWindow,
};
use envdash::{DashError, Result};

fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

fn scenario_readings() -> Vec<Reading> {
    vec![
        Reading::new(at(100), 20.0, 40.0, 5.0),
        Reading::new(at(200), 22.0, 42.0, 6.0),
        Reading::new(at(300), 25.0, 45.0, 7.0),
    ]
}

fn apply_frame(core: &mut DashboardCore, frame: &str) {
    for event in decode_frame(frame, LiveReadingPolicy::Truthy).unwrap() {
        core.apply(event);
    }
}

struct FixedSource(Vec<Reading>);

impl HistorySource for FixedSource {
    fn fetch_history(&self) -> impl Future<Output = Result<Vec<Reading>>> + Send {
        let readings = self.0.clone();
        async move { Ok(readings) }
    }
}

struct OfflineSource;

impl HistorySource for OfflineSource {
    fn fetch_history(&self) -> impl Future<Output = Result<Vec<Reading>>> + Send {
        async { Err(DashError::fetch("connection refused")) }
    }
}

#[test]
fn test_window_scenario_series_and_stats() {
    let mut core = DashboardCore::new(StoreOptions::default());
    core.apply(ChannelEvent::FullHistorySnapshot(scenario_readings()));
    core.set_window(at(150), at(300));

    let series = core.filtered_series();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].timestamp, at(200));
    assert_eq!(series[1].timestamp, at(300));

    let temperature = core.stats(Metric::Temperature);
    assert_eq!(temperature.avg, 23.5);
    assert_eq!(temperature.min, 22.0);
    assert_eq!(temperature.max, 25.0);
}

#[test]
fn test_inverted_window_is_empty() {
    let mut core = DashboardCore::new(StoreOptions::default());
    core.apply(ChannelEvent::FullHistorySnapshot(scenario_readings()));
    core.set_window(at(300), at(100));

    assert!(core.filtered_series().is_empty());
    assert_eq!(core.stats(Metric::Humidity).avg, 0.0);
    assert_eq!(core.stats(Metric::Humidity).count, 0);
}

#[test]
fn test_filter_is_idempotent() {
    let window = TimeWindow::new(at(150), at(300));
    let once = filter(&scenario_readings(), &window);
    let twice = filter(&once, &window);
    assert_eq!(once, twice);
}

#[test]
fn test_zero_live_value_is_dropped() {
    let mut core = DashboardCore::default();
    apply_frame(&mut core, r#"{"temperature":21,"humidity":40,"lightLevel":3}"#);
    let before = core.current_metrics();

    apply_frame(&mut core, r#"{"temperature":0,"humidity":50,"lightLevel":10}"#);
    assert_eq!(core.current_metrics(), before);
    assert_eq!(
        before,
        LiveSnapshot {
            temperature: 21.0,
            humidity: 40.0,
            light_level: 3.0,
        }
    );
}

#[test]
fn test_status_frame_touches_only_status() {
    let mut core = DashboardCore::default();
    core.apply(ChannelEvent::FullHistorySnapshot(scenario_readings()));
    apply_frame(&mut core, r#"{"temperature":21,"humidity":40,"lightLevel":3}"#);
    let live = core.current_metrics();
    let store = core.snapshot();

    apply_frame(&mut core, r#"{"status":{"dht22":"active","ldr":"inactive"}}"#);

    let status = core.sensor_status();
    assert_eq!(status.len(), 2);
    assert_eq!(status.get("dht22"), SensorState::Active);
    assert_eq!(status.get("ldr"), SensorState::Inactive);
    assert_eq!(core.current_metrics(), live);
    assert_eq!(core.snapshot(), store);
}

#[test]
fn test_history_frame_replaces_store() {
    let mut core = DashboardCore::default();
    core.apply(ChannelEvent::FullHistorySnapshot(scenario_readings()));

    apply_frame(
        &mut core,
        r#"{"history":[{"timestamp":500,"temperature":19,"humidity":39,"lightLevel":4}]}"#,
    );

    let snapshot = core.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].timestamp, at(500));
}

#[test]
fn test_snapshot_is_stable_across_replacement() {
    let mut core = DashboardCore::default();
    core.apply(ChannelEvent::FullHistorySnapshot(scenario_readings()));
    let held = core.snapshot();

    core.apply(ChannelEvent::FullHistorySnapshot(Vec::new()));
    assert_eq!(held.len(), 3);
    assert!(core.snapshot().is_empty());
}

#[test]
fn test_capacity_and_sort_options() {
    let mut core = DashboardCore::new(StoreOptions {
        sort_on_replace: true,
        capacity: Some(2),
    });
    let mut readings = scenario_readings();
    readings.reverse();
    core.apply(ChannelEvent::FullHistorySnapshot(readings));

    let snapshot = core.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].timestamp, at(200));
    assert_eq!(snapshot[1].timestamp, at(300));
}

#[tokio::test]
async fn test_refresh_installs_pulled_history() {
    let mut core = DashboardCore::default();
    core.set_window(at(0), at(1_000));

    let installed = core
        .refresh_history(&FixedSource(scenario_readings()))
        .await
        .unwrap();

    assert_eq!(installed, 3);
    assert_eq!(core.filtered_series().len(), 3);
    assert!(!core.is_refreshing());
    assert!(core.last_fetch_error().is_none());
}

#[tokio::test]
async fn test_failed_pull_leaves_store_unchanged() {
    let mut core = DashboardCore::default();
    core.apply(ChannelEvent::FullHistorySnapshot(scenario_readings()));
    let before = core.snapshot();

    let err = core.refresh_history(&OfflineSource).await.unwrap_err();

    assert!(err.is_fetch());
    assert_eq!(core.snapshot(), before);
    assert!(!core.is_refreshing());
}

#[tokio::test]
async fn test_subscriber_sees_each_completed_event() {
    let mut core = DashboardCore::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    core.subscribe(move |change| sink.lock().unwrap().push(change));

    apply_frame(&mut core, r#"{"temperature":21,"humidity":40,"lightLevel":3}"#);
    core.refresh_history(&FixedSource(scenario_readings()))
        .await
        .unwrap();
    core.set_window(at(0), at(1));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            Change::LiveMetrics,
            Change::Refresh,
            Change::History,
            Change::Window
        ]
    );
}
