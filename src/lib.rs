// envdash Library - Public API

// Re-export error types
pub mod error;
pub use error::{DashError, Result, ValidationError};

// Module declarations
pub mod commands;
pub mod core;
pub mod ui;

// Re-export commonly used types
pub use crate::core::config::Config;

/// Initialize logging at `level`; `RUST_LOG` takes precedence when set.
pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
