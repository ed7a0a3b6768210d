// Core business logic module

pub mod config;
pub mod dashboard;

// Re-export commonly used items
pub use config::Config;
pub use dashboard::{DashboardCore, DashboardRuntime, DashboardView, RuntimeOptions};
