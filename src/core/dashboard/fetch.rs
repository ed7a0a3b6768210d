//! On-demand pull of historical readings over HTTP.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::frame::decode_readings;
use super::reading::Reading;
use crate::error::{DashError, Result};

/// Anything that can deliver a full history batch
pub trait HistorySource {
    fn fetch_history(&self) -> impl Future<Output = Result<Vec<Reading>>> + Send;
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    history: Vec<Value>,
}

/// HTTP client for the history endpoint
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    url: Url,
}

impl HistoryClient {
    pub fn new(url: Url) -> Result<Self> {
        Self::with_timeout(url, None)
    }

    /// `timeout` of `None` leaves the request unbounded
    pub fn with_timeout(url: Url, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| DashError::fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// GET the history endpoint and validate every reading.
    ///
    /// Network, HTTP status and body decode failures are all fetch errors.
    pub async fn fetch(&self) -> Result<Vec<Reading>> {
        log::debug!("Fetching history from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| DashError::fetch(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashError::fetch(format!(
                "history endpoint returned status {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DashError::fetch(format!("failed to read history body: {}", e)))?;

        let payload: HistoryPayload = serde_json::from_slice(&body)
            .map_err(|e| DashError::fetch(format!("invalid history payload: {}", e)))?;

        let readings = decode_readings(&payload.history);
        log::info!(
            "Fetched {} readings ({} received)",
            readings.len(),
            payload.history.len()
        );

        Ok(readings)
    }
}

impl HistorySource for HistoryClient {
    fn fetch_history(&self) -> impl Future<Output = Result<Vec<Reading>>> + Send {
        self.fetch()
    }
}
