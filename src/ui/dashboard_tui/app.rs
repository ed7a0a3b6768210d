use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::core::dashboard::{DashboardRuntime, DashboardView, RuntimeOptions};

use super::event_handler::{DashboardEvent, WindowPreset};
use super::render::render_ui;

const TICK: Duration = Duration::from_millis(250);

/// Dashboard application state
pub struct DashboardApp {
    pub runtime: DashboardRuntime,
    pub view: Arc<DashboardView>,
    pub should_quit: bool,
    pub show_help: bool,
    /// Last preset picked; `None` for a window given on the command line
    pub preset: Option<WindowPreset>,
}

impl DashboardApp {
    pub fn new(runtime: DashboardRuntime, preset: Option<WindowPreset>) -> Self {
        let view = runtime.view();
        Self {
            runtime,
            view,
            should_quit: false,
            show_help: false,
            preset,
        }
    }

    /// Pick up the latest published view
    pub fn sync_view(&mut self) {
        if self.runtime.view_rx.has_changed().unwrap_or(false) {
            self.view = Arc::clone(&self.runtime.view_rx.borrow_and_update());
        }
    }

    pub fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Quit => self.should_quit = true,
            DashboardEvent::ToggleHelp => self.show_help = !self.show_help,
            DashboardEvent::Refresh => {
                // relative presets slide forward with the clock
                if let Some(preset) = self.preset.filter(|p| *p != WindowPreset::WholeStore) {
                    self.runtime.set_window(preset.resolve(self.view.history_span));
                }
                self.runtime.request_refresh();
            }
            DashboardEvent::SelectWindow(preset) => {
                self.preset = Some(preset);
                self.runtime.set_window(preset.resolve(self.view.history_span));
            }
            DashboardEvent::None => {}
        }
    }
}

/// Configuration for the dashboard app
#[derive(Debug, Clone)]
pub struct DashboardAppConfig {
    pub runtime: RuntimeOptions,
    pub preset: Option<WindowPreset>,
}

/// Run the dashboard TUI application
pub fn run_dashboard_app(config: DashboardAppConfig) -> Result<()> {
    let runtime = DashboardRuntime::start(config.runtime)?;
    let mut app = DashboardApp::new(runtime, config.preset);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    app.runtime.shutdown();
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut DashboardApp,
) -> Result<()> {
    loop {
        app.sync_view();
        terminal.draw(|frame| render_ui(frame, app))?;

        if event::poll(TICK).context("Event poll failed")? {
            if let Event::Key(key) = event::read().context("Event read failed")? {
                if key.kind == KeyEventKind::Press {
                    let dashboard_event = if app.show_help {
                        // any key closes the help overlay
                        DashboardEvent::ToggleHelp
                    } else {
                        DashboardEvent::from_key(key.code)
                    };
                    app.handle_event(dashboard_event);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
