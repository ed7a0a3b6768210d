use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::core::dashboard::{LiveReadingPolicy, StoreOptions};
use crate::error::DashError;

pub const DEFAULT_PUSH_URL: &str = "ws://localhost:4000";
pub const DEFAULT_HISTORY_URL: &str = "http://localhost:3000/history";

/// Keys accepted by `Config::set_value`
pub const CONFIG_KEYS: &[&str] = &[
    "push-url",
    "history-url",
    "reconnect",
    "reconnect-initial-ms",
    "reconnect-max-ms",
    "reconnect-jitter",
    "live-policy",
    "sort-on-replace",
    "history-capacity",
    "fetch-timeout",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of each delay that may be randomly shaved off (0.0..=1.0)
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub push_url: String,
    pub history_url: String,
    pub reconnect: ReconnectConfig,
    pub live_reading_policy: LiveReadingPolicy,
    pub sort_on_replace: bool,
    /// Maximum readings kept in the store; `None` keeps everything
    pub history_capacity: Option<usize>,
    /// HTTP timeout for the history pull; `None` waits indefinitely
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            push_url: DEFAULT_PUSH_URL.to_string(),
            history_url: DEFAULT_HISTORY_URL.to_string(),
            reconnect: ReconnectConfig::default(),
            live_reading_policy: LiveReadingPolicy::default(),
            sort_on_replace: false,
            history_capacity: None,
            fetch_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Missing or empty files yield defaults. A corrupt file also yields defaults,
    /// with a warning, so an old format never blocks startup.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Config::default());
        }

        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;

        fs::write(path, data).with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("envdash").join("config.json"))
    }

    pub fn push_url(&self) -> crate::Result<Url> {
        parse_push_url(&self.push_url)
    }

    pub fn history_url(&self) -> crate::Result<Url> {
        parse_history_url(&self.history_url)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            sort_on_replace: self.sort_on_replace,
            capacity: self.history_capacity,
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    /// Update one setting from its command-line spelling.
    pub fn set_value(&mut self, key: &str, value: &str) -> crate::Result<()> {
        match key {
            "push-url" => {
                parse_push_url(value)?;
                self.push_url = value.to_string();
            }
            "history-url" => {
                parse_history_url(value)?;
                self.history_url = value.to_string();
            }
            "reconnect" => self.reconnect.enabled = parse_bool(key, value)?,
            "reconnect-initial-ms" => self.reconnect.initial_delay_ms = parse_number(key, value)?,
            "reconnect-max-ms" => self.reconnect.max_delay_ms = parse_number(key, value)?,
            "reconnect-jitter" => {
                let jitter: f64 = parse_number(key, value)?;
                if !(0.0..=1.0).contains(&jitter) {
                    return Err(DashError::config("reconnect-jitter must be between 0 and 1"));
                }
                self.reconnect.jitter = jitter;
            }
            "live-policy" => {
                self.live_reading_policy = value.parse().map_err(DashError::config)?;
            }
            "sort-on-replace" => self.sort_on_replace = parse_bool(key, value)?,
            "history-capacity" => self.history_capacity = parse_optional(key, value)?,
            "fetch-timeout" => self.fetch_timeout_secs = parse_optional(key, value)?,
            _ => {
                return Err(DashError::config(format!(
                    "unknown key '{}' (expected one of: {})",
                    key,
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

/// Parse a push endpoint, which must be `ws` or `wss`
pub fn parse_push_url(value: &str) -> crate::Result<Url> {
    parse_url(value, &["ws", "wss"])
}

/// Parse a history endpoint, which must be `http` or `https`
pub fn parse_history_url(value: &str) -> crate::Result<Url> {
    parse_url(value, &["http", "https"])
}

fn parse_url(value: &str, schemes: &[&str]) -> crate::Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| DashError::config(format!("invalid URL '{}': {}", value, e)))?;

    if !schemes.contains(&url.scheme()) {
        return Err(DashError::config(format!(
            "URL '{}' must use one of: {}",
            value,
            schemes.join(", ")
        )));
    }
    Ok(url)
}

fn parse_bool(key: &str, value: &str) -> crate::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(DashError::config(format!("{} expects true or false, got '{}'", key, value))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DashError::config(format!("{} expects a number, got '{}'", key, value)))
}

// "none" clears the setting
fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<Option<T>> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_number(key, value).map(Some)
}
