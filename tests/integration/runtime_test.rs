use std::time::{Duration, Instant};

use chrono::DateTime;
use envdash::core::config::ReconnectConfig;
use envdash::core::dashboard::{
    ChannelState, DashboardRuntime, DashboardView, LiveReadingPolicy, RuntimeOptions,
    SensorState, StoreOptions, TimeWindow,
};

use super::support::{http_server, text, ws_server};

const HISTORY_BODY: &str = r#"{"history":[
    {"timestamp":1000,"temperature":20,"humidity":40,"lightLevel":5},
    {"timestamp":2000,"temperature":24,"humidity":44,"lightLevel":9}
]}"#;

/// Poll the published view until `ready` holds.
fn wait_for_view(runtime: &DashboardRuntime, ready: impl Fn(&DashboardView) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if ready(&runtime.view()) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn test_runtime_merges_push_and_pull() {
    // servers live on their own runtime, separate from the dashboard's
    let servers = tokio::runtime::Runtime::new().unwrap();
    let (push_url, _ws) = servers.block_on(ws_server(
        vec![
            text(r#"{"status":{"dht22":"active","ldr":"active"}}"#),
            text(r#"{"temperature":23,"humidity":41,"lightLevel":7}"#),
        ],
        true,
    ));
    let history_url = servers.block_on(http_server("200 OK", HISTORY_BODY.to_string()));

    let runtime = DashboardRuntime::start(RuntimeOptions {
        push_url,
        history_url,
        reconnect: ReconnectConfig::default(),
        policy: LiveReadingPolicy::Truthy,
        store: StoreOptions::default(),
        fetch_timeout: Some(Duration::from_secs(5)),
        initial_window: TimeWindow::new(
            DateTime::from_timestamp_millis(0).unwrap(),
            DateTime::from_timestamp_millis(1_500).unwrap(),
        ),
        refresh_on_start: true,
    })
    .unwrap();

    assert!(wait_for_view(&runtime, |view| {
        view.store_len == 2
            && view.live.temperature == 23.0
            && view.status.get("ldr") == SensorState::Active
            && view.connection == ChannelState::Connected
    }));

    let view = runtime.view();
    assert_eq!(view.series.len(), 1);
    assert_eq!(view.stats.temperature.avg, 20.0);
    assert!(!view.refreshing);

    // widening the window recomputes the view
    assert!(runtime.set_window(TimeWindow::new(
        DateTime::from_timestamp_millis(0).unwrap(),
        DateTime::from_timestamp_millis(5_000).unwrap(),
    )));
    assert!(wait_for_view(&runtime, |view| view.series.len() == 2));
    assert_eq!(runtime.view().stats.temperature.avg, 22.0);

    assert_eq!(runtime.refresh_blocking().unwrap(), 2);

    runtime.shutdown();
}

#[test]
fn test_runtime_reports_failed_pull() {
    let servers = tokio::runtime::Runtime::new().unwrap();
    let (push_url, _ws) = servers.block_on(ws_server(Vec::new(), true));
    let history_url = servers.block_on(http_server("503 Service Unavailable", String::new()));

    let runtime = DashboardRuntime::start(RuntimeOptions {
        push_url,
        history_url,
        reconnect: ReconnectConfig::default(),
        policy: LiveReadingPolicy::Truthy,
        store: StoreOptions::default(),
        fetch_timeout: Some(Duration::from_secs(5)),
        initial_window: TimeWindow::now(),
        refresh_on_start: false,
    })
    .unwrap();

    let err = runtime.refresh_blocking().unwrap_err();
    assert!(err.is_fetch());
    assert!(wait_for_view(&runtime, |view| view.last_error.is_some()));
    assert_eq!(runtime.view().store_len, 0);

    runtime.shutdown();
}
