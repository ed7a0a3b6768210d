use chrono::{DateTime, Duration, Utc};
use crossterm::event::KeyCode;

use crate::core::dashboard::TimeWindow;

/// Quick window selections bound to the number keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPreset {
    LastHour,
    LastDay,
    LastWeek,
    /// From the oldest to the newest reading in the store
    WholeStore,
}

impl WindowPreset {
    pub fn label(&self) -> &'static str {
        match self {
            WindowPreset::LastHour => "last hour",
            WindowPreset::LastDay => "last 24h",
            WindowPreset::LastWeek => "last 7 days",
            WindowPreset::WholeStore => "all history",
        }
    }

    /// Resolve against the current clock and the store's time span.
    pub fn resolve(&self, span: Option<(DateTime<Utc>, DateTime<Utc>)>) -> TimeWindow {
        match self {
            WindowPreset::LastHour => TimeWindow::last(Duration::hours(1)),
            WindowPreset::LastDay => TimeWindow::last(Duration::days(1)),
            WindowPreset::LastWeek => TimeWindow::last(Duration::days(7)),
            WindowPreset::WholeStore => span
                .map(|(start, end)| TimeWindow::new(start, end))
                .unwrap_or_else(TimeWindow::now),
        }
    }
}

/// Events that can occur in the dashboard TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Quit the application
    Quit,
    /// Toggle help overlay
    ToggleHelp,
    /// Pull the history again
    Refresh,
    /// Switch the time window
    SelectWindow(WindowPreset),
    /// No action
    None,
}

impl DashboardEvent {
    pub fn from_key(code: KeyCode) -> Self {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => DashboardEvent::Quit,
            KeyCode::Char('?') | KeyCode::Char('h') => DashboardEvent::ToggleHelp,
            KeyCode::Char('r') => DashboardEvent::Refresh,
            KeyCode::Char('1') => DashboardEvent::SelectWindow(WindowPreset::LastHour),
            KeyCode::Char('2') => DashboardEvent::SelectWindow(WindowPreset::LastDay),
            KeyCode::Char('3') => DashboardEvent::SelectWindow(WindowPreset::LastWeek),
            KeyCode::Char('4') => DashboardEvent::SelectWindow(WindowPreset::WholeStore),
            _ => DashboardEvent::None,
        }
    }
}
