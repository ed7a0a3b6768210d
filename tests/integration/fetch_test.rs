use envdash::core::dashboard::{HistoryClient, HistorySource, Metric};

use super::support::http_server;

const HISTORY_BODY: &str = r#"{"history":[
    {"timestamp":1714557600000,"temperature":20.5,"humidity":40,"lightLevel":120},
    {"timestamp":"2024-05-01 10:05:00","temperature":21.5,"humidity":42,"lightLevel":130},
    {"timestamp":1714558200000,"temperature":null,"humidity":42,"lightLevel":130}
]}"#;

#[tokio::test]
async fn test_fetch_validates_readings() {
    let url = http_server("200 OK", HISTORY_BODY.to_string()).await;
    let client = HistoryClient::new(url).unwrap();

    let readings = client.fetch_history().await.unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].timestamp.timestamp_millis(), 1_714_557_600_000);
    assert_eq!(readings[1].value(Metric::Humidity), 42.0);
    // naive timestamps are UTC
    assert_eq!(readings[1].timestamp.timestamp_millis(), 1_714_557_900_000);
}

#[tokio::test]
async fn test_server_error_is_fetch_error() {
    let url = http_server("500 Internal Server Error", r#"{"error":"boom"}"#.to_string()).await;
    let client = HistoryClient::new(url).unwrap();

    let err = client.fetch().await.unwrap_err();
    assert!(err.is_fetch());
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_malformed_body_is_fetch_error() {
    let url = http_server("200 OK", "<html>oops</html>".to_string()).await;
    let client = HistoryClient::new(url).unwrap();

    assert!(client.fetch().await.unwrap_err().is_fetch());
}

#[tokio::test]
async fn test_missing_history_key_is_fetch_error() {
    let url = http_server("200 OK", r#"{"readings":[]}"#.to_string()).await;
    let client = HistoryClient::new(url).unwrap();

    assert!(client.fetch().await.unwrap_err().is_fetch());
}
