// Command handlers module
pub mod config;
pub mod history;
pub mod watch;
pub mod window_args;

// Re-exports for cleaner imports
pub use history::execute as history;
pub use watch::execute as watch;
