use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use log::LevelFilter;

use envdash::commands;
use envdash::commands::window_args::with_window_args;
use envdash::core::config::CONFIG_KEYS;

fn cli() -> Command {
    Command::new("envdash")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live and historical environmental sensor dashboard")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log output (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(with_window_args(
            Command::new("watch")
                .about("Open the live dashboard in the terminal")
                .arg(
                    Arg::new("push-url")
                        .long("push-url")
                        .value_name("URL")
                        .help("WebSocket endpoint of the telemetry server"),
                )
                .arg(
                    Arg::new("history-url")
                        .long("history-url")
                        .value_name("URL")
                        .help("HTTP endpoint serving the full history"),
                )
                .arg(
                    Arg::new("no-reconnect")
                        .long("no-reconnect")
                        .help("Do not reconnect after the push channel drops")
                        .action(ArgAction::SetTrue),
                ),
        ))
        .subcommand(with_window_args(
            Command::new("history")
                .about("Fetch the history once and print window statistics")
                .arg(
                    Arg::new("history-url")
                        .long("history-url")
                        .value_name("URL")
                        .help("HTTP endpoint serving the full history"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print readings and statistics as JSON")
                        .action(ArgAction::SetTrue),
                ),
        ))
        .subcommand(
            Command::new("config")
                .about("Show or change settings (use 'envdash config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the current settings"))
                .subcommand(
                    Command::new("set")
                        .about("Change one setting")
                        .arg(
                            Arg::new("key")
                                .help("Setting name")
                                .value_parser(CONFIG_KEYS.to_vec())
                                .required(true)
                                .index(1),
                        )
                        .arg(
                            Arg::new("value")
                                .help("New value ('none' clears optional settings)")
                                .required(true)
                                .index(2),
                        ),
                )
                .subcommand(Command::new("reset").about("Restore default settings"))
                .subcommand(Command::new("path").about("Print the config file location")),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let verbosity = matches.get_count("verbose");
    let is_tui = matches!(matches.subcommand(), Some(("watch", _)));
    let level = match verbosity {
        // the TUI owns the terminal, so stay quiet unless asked
        0 if is_tui => LevelFilter::Off,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    envdash::init_logging(level);

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch(sub_matches)?,
        Some(("history", sub_matches)) => commands::history(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        _ => {}
    }

    Ok(())
}
