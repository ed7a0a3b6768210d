//! Live dashboard command handler.

use anyhow::{Context, Result};
use clap::ArgMatches;

use super::window_args::window_from_matches;
use crate::core::config::{parse_history_url, parse_push_url, Config};
use crate::core::dashboard::RuntimeOptions;
use crate::ui::{run_dashboard_app, DashboardAppConfig, WindowPreset};

/// Execute the watch command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = Config::load()?;
    let mut options = RuntimeOptions::from_config(&config)?;

    apply_endpoint_overrides(&mut options, matches)?;
    if matches.get_flag("no-reconnect") {
        options.reconnect.enabled = false;
    }

    // An explicit window wins; otherwise start on the last 24 hours
    let preset = match window_from_matches(matches)? {
        Some(window) => {
            options.initial_window = window;
            None
        }
        None => {
            let preset = WindowPreset::LastDay;
            options.initial_window = preset.resolve(None);
            Some(preset)
        }
    };

    run_dashboard_app(DashboardAppConfig {
        runtime: options,
        preset,
    })
    .context("Failed to run dashboard")
}

fn apply_endpoint_overrides(options: &mut RuntimeOptions, matches: &ArgMatches) -> Result<()> {
    if let Some(text) = matches.get_one::<String>("push-url") {
        options.push_url =
            parse_push_url(text).with_context(|| format!("Invalid push URL '{}'", text))?;
    }
    if let Some(text) = matches.get_one::<String>("history-url") {
        options.history_url =
            parse_history_url(text).with_context(|| format!("Invalid history URL '{}'", text))?;
    }
    Ok(())
}
