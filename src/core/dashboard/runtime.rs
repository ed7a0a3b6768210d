//! Tokio runtime and orchestrator for the dashboard.
//!
//! The orchestrator task owns the `DashboardCore`. Channel events, user commands,
//! pull completions and connection changes all arrive on queues and are applied one
//! at a time, so the core never needs a lock. After each event that changed
//! something, a fresh `DashboardView` is published on a watch channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use url::Url;

use super::adapter::DashboardView;
use super::channel::{supervise, Backoff, ChannelState, IngestionChannel};
use super::fetch::HistoryClient;
use super::frame::ChannelEvent;
use super::history::StoreOptions;
use super::reading::{LiveReadingPolicy, Reading};
use super::state::DashboardCore;
use super::window::TimeWindow;
use crate::core::config::{Config, ReconnectConfig};
use crate::error::{DashError, Result};

const EVENT_QUEUE: usize = 64;
const COMMAND_QUEUE: usize = 16;

/// Requests from the UI to the orchestrator
#[derive(Debug)]
pub enum DashboardCommand {
    SetWindow(TimeWindow),
    /// Pull the full history. `reply` receives the installed count or the fetch error.
    RefreshHistory {
        reply: Option<oneshot::Sender<Result<usize>>>,
    },
}

/// Everything needed to start a runtime
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub push_url: Url,
    pub history_url: Url,
    pub reconnect: ReconnectConfig,
    pub policy: LiveReadingPolicy,
    pub store: StoreOptions,
    pub fetch_timeout: Option<Duration>,
    pub initial_window: TimeWindow,
    /// Issue one history pull as soon as the runtime starts
    pub refresh_on_start: bool,
}

impl RuntimeOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            push_url: config.push_url()?,
            history_url: config.history_url()?,
            reconnect: config.reconnect.clone(),
            policy: config.live_reading_policy,
            store: config.store_options(),
            fetch_timeout: config.fetch_timeout(),
            initial_window: TimeWindow::now(),
            refresh_on_start: true,
        })
    }
}

struct FetchOutcome {
    result: Result<Vec<Reading>>,
    reply: Option<oneshot::Sender<Result<usize>>>,
}

/// Wrapper around the Tokio runtime driving the push channel and the pull client.
pub struct DashboardRuntime {
    /// Receiver for view snapshots
    pub view_rx: watch::Receiver<Arc<DashboardView>>,

    command_tx: mpsc::Sender<DashboardCommand>,

    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,

    /// Handle to the runtime (for shutdown)
    _runtime_handle: tokio::runtime::Runtime,
}

impl DashboardRuntime {
    /// Build the runtime and spawn the channel supervisor and orchestrator.
    ///
    /// Must not be called from inside another tokio runtime.
    pub fn start(options: RuntimeOptions) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("envdash-worker")
            .build()
            .context("Failed to build dashboard runtime")?;

        let history = HistoryClient::with_timeout(options.history_url.clone(), options.fetch_timeout)?;

        let mut core = DashboardCore::with_window(options.store, options.initial_window);
        let (view_tx, view_rx) = watch::channel(Arc::new(core.view()));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let channel = Arc::new(IngestionChannel::new(
            options.push_url.clone(),
            options.policy,
            events_tx,
        ));

        let dirty = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dirty);
        core.subscribe(move |_| flag.store(true, Ordering::Release));

        let orchestrator = Orchestrator {
            core,
            dirty,
            channel: Arc::clone(&channel),
            history,
            view_tx,
        };

        let backoff = Backoff::from_config(&options.reconnect);
        runtime.spawn(supervise(
            Arc::clone(&channel),
            backoff,
            options.reconnect.enabled,
        ));
        runtime.spawn(orchestrator.run(events_rx, command_rx, shutdown_tx.subscribe()));

        log::info!(
            "Dashboard runtime started (push {}, pull {})",
            options.push_url,
            options.history_url
        );

        let runtime_handle = Self {
            view_rx,
            command_tx,
            shutdown_tx,
            _runtime_handle: runtime,
        };

        if options.refresh_on_start {
            runtime_handle.request_refresh();
        }

        Ok(runtime_handle)
    }

    /// Latest published view
    pub fn view(&self) -> Arc<DashboardView> {
        Arc::clone(&self.view_rx.borrow())
    }

    pub fn set_window(&self, window: TimeWindow) -> bool {
        self.send(DashboardCommand::SetWindow(window))
    }

    /// Ask for a history pull without waiting for it
    pub fn request_refresh(&self) -> bool {
        self.send(DashboardCommand::RefreshHistory { reply: None })
    }

    /// Pull the history and block until it is installed or fails.
    ///
    /// Blocks the calling thread; do not call from async code.
    pub fn refresh_blocking(&self) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .blocking_send(DashboardCommand::RefreshHistory {
                reply: Some(reply_tx),
            })
            .map_err(|_| DashError::other("dashboard runtime has stopped"))?;

        reply_rx
            .blocking_recv()
            .map_err(|_| DashError::other("dashboard runtime dropped the refresh"))?
    }

    fn send(&self, command: DashboardCommand) -> bool {
        match self.command_tx.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Dashboard command dropped: {}", e);
                false
            }
        }
    }

    /// Shutdown the runtime gracefully.
    pub fn shutdown(self) {
        log::info!("Shutting down dashboard runtime");
        let _ = self.shutdown_tx.send(());
        // Runtime will shutdown when dropped
    }
}

struct Orchestrator {
    core: DashboardCore,
    dirty: Arc<AtomicBool>,
    channel: Arc<IngestionChannel>,
    history: HistoryClient,
    view_tx: watch::Sender<Arc<DashboardView>>,
}

impl Orchestrator {
    async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<ChannelEvent>,
        mut command_rx: mpsc::Receiver<DashboardCommand>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let (fetch_tx, mut fetch_rx) = mpsc::channel::<FetchOutcome>(COMMAND_QUEUE);
        let mut state_rx = self.channel.state_changes();

        loop {
            tokio::select! {
                Some(event) = events_rx.recv() => {
                    self.core.apply(event);
                }
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command, &fetch_tx),
                    None => {
                        log::debug!("Command sender dropped, stopping orchestrator");
                        break;
                    }
                },
                Some(outcome) = fetch_rx.recv() => {
                    let installed = self.core.complete_refresh(outcome.result);
                    if let Some(reply) = outcome.reply {
                        let _ = reply.send(installed);
                    }
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *state_rx.borrow_and_update();
                    self.core.set_connection(state);
                }
                _ = shutdown.recv() => {
                    self.channel.close();
                    self.core.set_connection(ChannelState::Closed);
                    self.publish();
                    break;
                }
            }

            self.publish();
        }
    }

    fn handle_command(&mut self, command: DashboardCommand, fetch_tx: &mpsc::Sender<FetchOutcome>) {
        match command {
            DashboardCommand::SetWindow(window) => {
                self.core.set_window(window.start, window.end);
            }
            DashboardCommand::RefreshHistory { reply } => {
                self.core.begin_refresh();

                let client = self.history.clone();
                let fetch_tx = fetch_tx.clone();
                tokio::spawn(async move {
                    let result = client.fetch().await;
                    if fetch_tx.send(FetchOutcome { result, reply }).await.is_err() {
                        log::debug!("Orchestrator gone before history pull completed");
                    }
                });
            }
        }
    }

    fn publish(&self) {
        if self.dirty.swap(false, Ordering::AcqRel) {
            // watch::send() only fails if there are no receivers (which is fine)
            let _ = self.view_tx.send(Arc::new(self.core.view()));
        }
    }
}
