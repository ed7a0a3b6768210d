//! Shared `--from` / `--to` / `--last` handling for commands that take a time window.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Arg, ArgMatches, Command};

use crate::core::dashboard::TimeWindow;

/// Attach the window arguments to `command`
pub fn with_window_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("from")
                .long("from")
                .value_name("TIME")
                .help("Window start (RFC 3339, 'YYYY-MM-DD HH:MM[:SS]' local, or YYYY-MM-DD)"),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .value_name("TIME")
                .help("Window end (defaults to now)"),
        )
        .arg(
            Arg::new("last")
                .long("last")
                .value_name("DURATION")
                .help("Window covering the last DURATION, e.g. 30m, 6h, 7d")
                .conflicts_with("from"),
        )
}

/// Window requested on the command line, if any
pub fn window_from_matches(matches: &ArgMatches) -> Result<Option<TimeWindow>> {
    let from = matches.get_one::<String>("from");
    let to = matches.get_one::<String>("to");
    let last = matches.get_one::<String>("last");

    if from.is_none() && to.is_none() && last.is_none() {
        return Ok(None);
    }

    let end = match to {
        Some(text) => parse_time(text).with_context(|| format!("Invalid --to value '{}'", text))?,
        None => Utc::now(),
    };

    let start = match (from, last) {
        (Some(text), _) => {
            parse_time(text).with_context(|| format!("Invalid --from value '{}'", text))?
        }
        (None, Some(text)) => {
            let duration =
                parse_duration(text).with_context(|| format!("Invalid --last value '{}'", text))?;
            end.checked_sub_signed(duration)
                .context("--last reaches before the earliest representable time")?
        }
        (None, None) => bail!("--to needs either --from or --last"),
    };

    Ok(Some(TimeWindow::new(start, end)))
}

/// Parse a duration such as `90s`, `30m`, `6h`, `7d` or `2w`.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);

    let amount: i64 = digits
        .parse()
        .with_context(|| format!("'{}' does not start with a number", text))?;

    let duration = match unit {
        "s" => Duration::try_seconds(amount),
        "m" | "" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        other => bail!("unknown duration unit '{}' (use s, m, h, d or w)", other),
    };

    duration.with_context(|| format!("duration '{}' is out of range", text))
}

/// Parse a wall-clock time. Offset-carrying forms are taken as given; naive forms
/// are read in the local time zone.
pub fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local_to_utc(naive);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return local_to_utc(midnight);
        }
    }

    // epoch milliseconds, as on the wire
    if let Ok(millis) = text.parse::<i64>() {
        if let Some(parsed) = DateTime::from_timestamp_millis(millis) {
            return Ok(parsed);
        }
    }

    bail!("unrecognized time '{}'", text)
}

fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .with_context(|| format!("{} does not exist in the local time zone", naive))
}
