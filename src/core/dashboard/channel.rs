//! Live push channel: one long-lived WebSocket connection to the telemetry server.
//!
//! The channel decodes inbound frames and forwards typed events on an `mpsc`
//! queue. Connection state is published on a `watch` channel so a supervisor can
//! reconnect after a disconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::frame::{decode_frame, ChannelEvent};
use super::reading::LiveReadingPolicy;
use crate::core::config::ReconnectConfig;
use crate::error::{DashError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

impl ChannelState {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelState::Idle => "idle",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Disconnected => "disconnected",
            ChannelState::Closed => "closed",
        }
    }
}

pub struct IngestionChannel {
    url: Url,
    policy: LiveReadingPolicy,
    events_tx: mpsc::Sender<ChannelEvent>,
    state_tx: Arc<watch::Sender<ChannelState>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl IngestionChannel {
    pub fn new(url: Url, policy: LiveReadingPolicy, events_tx: mpsc::Sender<ChannelEvent>) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Idle);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            url,
            policy,
            events_tx,
            state_tx: Arc::new(state_tx),
            shutdown_tx,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> ChannelState {
        *self.state_tx.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ChannelState::Closed
    }

    /// Receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// Connect and start reading frames in a background task.
    ///
    /// Must be called inside a tokio runtime. Fails with a transport error if the
    /// connection cannot be established or the channel was closed.
    pub async fn open(&self) -> Result<()> {
        match self.state() {
            ChannelState::Closed => return Err(DashError::transport("channel is closed")),
            ChannelState::Connecting | ChannelState::Connected => return Ok(()),
            ChannelState::Idle | ChannelState::Disconnected => {}
        }

        transition(&self.state_tx, ChannelState::Connecting);
        // subscribe before connecting so a close() during the handshake is not missed
        let shutdown = self.shutdown_tx.subscribe();

        log::info!("Connecting to push channel {}", self.url);

        let stream = match connect_async(self.url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                transition(&self.state_tx, ChannelState::Disconnected);
                return Err(DashError::transport(format!(
                    "failed to connect to {}: {}",
                    self.url, e
                )));
            }
        };

        if !transition(&self.state_tx, ChannelState::Connected) {
            return Err(DashError::transport("channel closed during connect"));
        }

        log::info!("Push channel connected");

        tokio::spawn(read_frames(
            stream,
            self.events_tx.clone(),
            Arc::clone(&self.state_tx),
            shutdown,
            self.policy,
        ));

        Ok(())
    }

    /// Terminate the connection. Idempotent.
    pub fn close(&self) {
        let previous = self.state_tx.send_replace(ChannelState::Closed);
        if previous == ChannelState::Closed {
            return;
        }
        // no reader task means no receivers; nothing to stop
        let _ = self.shutdown_tx.send(());
        log::info!("Push channel closed");
    }

    /// Resolves once the connection is lost or the channel is closed.
    pub async fn disconnected(&self) {
        let mut state = self.state_tx.subscribe();
        let _ = state
            .wait_for(|s| matches!(s, ChannelState::Disconnected | ChannelState::Closed))
            .await
            .map(|_| ());
    }
}

/// Apply a state transition unless the channel is already closed.
/// Returns false when the transition was refused.
fn transition(state_tx: &watch::Sender<ChannelState>, next: ChannelState) -> bool {
    let mut applied = false;
    state_tx.send_if_modified(|state| {
        if *state == ChannelState::Closed || *state == next {
            return false;
        }
        *state = next;
        applied = true;
        true
    });
    applied || *state_tx.borrow() == next
}

async fn read_frames(
    mut stream: WsStream,
    events_tx: mpsc::Sender<ChannelEvent>,
    state_tx: Arc<watch::Sender<ChannelState>>,
    mut shutdown: broadcast::Receiver<()>,
    policy: LiveReadingPolicy,
) {
    loop {
        tokio::select! {
            message = stream.next() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(e) => {
                            log::debug!("Dropping binary frame: {}", e);
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        log::info!("Push channel closed by server: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        log::warn!("Push channel error: {}", e);
                        break;
                    }
                    None => break,
                };

                let events = match decode_frame(&text, policy) {
                    Ok(events) => events,
                    Err(e) => {
                        log::debug!("Dropping frame: {}", e);
                        continue;
                    }
                };

                for event in events {
                    if events_tx.send(event).await.is_err() {
                        log::debug!("Event receiver dropped, stopping push reader");
                        let _ = stream.close(None).await;
                        transition(&state_tx, ChannelState::Disconnected);
                        return;
                    }
                }
            }
            _ = shutdown.recv() => {
                let _ = stream.close(None).await;
                return;
            }
        }
    }

    transition(&state_tx, ChannelState::Disconnected);
    log::info!("Push channel disconnected");
}

/// Exponential, capped, jittered reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            initial,
            max: max.max(initial),
            jitter: jitter.clamp(0.0, 1.0),
            attempt: 0,
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.jitter,
        )
    }

    /// Delay before the next attempt: `initial * 2^attempt`, capped, then reduced
    /// by up to `jitter` of itself.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt);
        let base = self.initial.saturating_mul(factor).min(self.max);
        self.attempt = self.attempt.saturating_add(1).min(31);

        if self.jitter == 0.0 {
            return base;
        }
        base.mul_f64(1.0 - self.jitter * rand::random::<f64>())
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Keep the channel connected until it is closed.
///
/// With `reconnect` disabled the supervisor returns after the first disconnect.
pub async fn supervise(channel: Arc<IngestionChannel>, mut backoff: Backoff, reconnect: bool) {
    loop {
        match channel.open().await {
            Ok(()) => {
                backoff.reset();
                channel.disconnected().await;
            }
            Err(e) => log::warn!("Push channel unavailable: {}", e),
        }

        if channel.is_closed() || !reconnect {
            break;
        }

        let delay = backoff.next_delay();
        log::info!(
            "Reconnecting to {} in {}ms",
            channel.url(),
            delay.as_millis()
        );

        let mut state = channel.state_changes();
        let closed = async {
            state
                .wait_for(|s| *s == ChannelState::Closed)
                .await
                .map(|_| ())
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = closed => break,
        }
    }
}
