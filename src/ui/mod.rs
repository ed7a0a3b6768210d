// UI module

pub mod dashboard_tui;

// Re-export commonly used items for cleaner imports
pub use dashboard_tui::{run_dashboard_app, DashboardAppConfig, WindowPreset};
