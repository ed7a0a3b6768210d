use anyhow::{Context, Result};
use colored::Colorize;

use crate::core::config::{Config, CONFIG_KEYS};

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set", sub_matches)) => set(sub_matches),
        Some(("reset", _)) => reset(),
        Some(("path", _)) => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
        _ => {
            println!("Use 'envdash config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Configuration".bold().cyan());
    println!("{} {}", "File:".dimmed(), Config::config_path()?.display());
    println!();
    print_entry("push-url", &config.push_url);
    print_entry("history-url", &config.history_url);
    print_entry("reconnect", &config.reconnect.enabled.to_string());
    print_entry("reconnect-initial-ms", &config.reconnect.initial_delay_ms.to_string());
    print_entry("reconnect-max-ms", &config.reconnect.max_delay_ms.to_string());
    print_entry("reconnect-jitter", &config.reconnect.jitter.to_string());
    print_entry("live-policy", &config.live_reading_policy.to_string());
    print_entry("sort-on-replace", &config.sort_on_replace.to_string());
    print_entry("history-capacity", &optional(config.history_capacity));
    print_entry("fetch-timeout", &optional(config.fetch_timeout_secs));

    Ok(())
}

fn set(matches: &clap::ArgMatches) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;
    let value = matches
        .get_one::<String>("value")
        .context("Value argument is required")?;

    let mut config = Config::load()?;
    if let Err(e) = config.set_value(key, value) {
        println!("{}", format!("✗ {}", e).red());
        println!("{} {}", "Valid keys:".dimmed(), CONFIG_KEYS.join(", "));
        return Err(e.into());
    }
    config.save()?;

    println!("{}", format!("✓ {} set to {}", key, value).green());
    Ok(())
}

fn reset() -> Result<()> {
    Config::default().save()?;
    println!("{}", "✓ Configuration reset to defaults".green());
    Ok(())
}

fn print_entry(key: &str, value: &str) {
    println!("  {:<22} {}", key.bold(), value);
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}
