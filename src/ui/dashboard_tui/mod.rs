//! Terminal User Interface for the sensor dashboard.
//!
//! Live cards and windowed history charts using ratatui.

mod app;
mod event_handler;
mod render;
mod widgets;

pub use app::{run_dashboard_app, DashboardApp, DashboardAppConfig};
pub use event_handler::{DashboardEvent, WindowPreset};
