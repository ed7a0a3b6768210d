//! One-shot history pull: fetch, filter to a window and summarize.

use anyhow::{Context, Result};
use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use serde::Serialize;
use url::Url;

use super::window_args::window_from_matches;
use crate::core::config::{parse_history_url, Config};
use crate::core::dashboard::{
    round_one_decimal, DashboardCore, HistoryClient, Metric, MetricStats, Reading, TimeWindow,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryReport<'a> {
    source: &'a str,
    window: TimeWindow,
    received: usize,
    readings: &'a [Reading],
    stats: &'a MetricStats,
}

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = Config::load()?;

    let url = history_url_from(matches, &config)?;
    let requested = window_from_matches(matches)?;
    let json_output = matches.get_flag("json");

    let client = HistoryClient::with_timeout(url.clone(), config.fetch_timeout())?;
    let mut core = DashboardCore::new(config.store_options());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime
        .block_on(core.refresh_history(&client))
        .with_context(|| format!("Failed to fetch history from {}", url))?;

    // Without an explicit window, summarize everything that was received
    let window = requested
        .or_else(|| core.history_span().map(|(start, end)| TimeWindow::new(start, end)))
        .unwrap_or_else(TimeWindow::now);
    core.set_window(window.start, window.end);

    if json_output {
        let report = HistoryReport {
            source: url.as_str(),
            window,
            received: core.snapshot().len(),
            readings: core.filtered_readings(),
            stats: core.all_stats(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&url, &core);
    Ok(())
}

fn history_url_from(matches: &ArgMatches, config: &Config) -> Result<Url> {
    match matches.get_one::<String>("history-url") {
        Some(text) => {
            parse_history_url(text).with_context(|| format!("Invalid history URL '{}'", text))
        }
        None => Ok(config.history_url()?),
    }
}

fn print_report(url: &Url, core: &DashboardCore) {
    let window = core.window();
    let filtered = core.filtered_readings();

    println!("{}", "Sensor History".bold().cyan());
    println!("{} {}", "Source:".dimmed(), url);
    println!(
        "{} {} → {}",
        "Window:".dimmed(),
        window.start.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        window.end.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "{} {} of {} readings",
        "Matched:".dimmed(),
        filtered.len().to_string().bold(),
        core.snapshot().len()
    );
    println!();

    if filtered.is_empty() {
        println!("{}", "No historical data available".yellow());
        return;
    }

    println!(
        "  {:<14} {:>10} {:>10} {:>10}",
        "Metric".bold(),
        "Avg".bold(),
        "Min".bold(),
        "Max".bold()
    );
    for metric in Metric::ALL {
        let stats = core.stats(metric);
        println!(
            "  {:<14} {:>10} {:>10} {:>10}",
            metric.label(),
            format_value(stats.avg, metric),
            format_value(stats.min, metric).blue(),
            format_value(stats.max, metric).red()
        );
    }
}

fn format_value(value: f64, metric: Metric) -> String {
    format!("{:.1}{}", round_one_decimal(value), metric.unit())
}
