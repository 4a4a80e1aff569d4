use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $RELOJ_CONFIG
  3) XDG default: ~/.config/reloj/client.yaml (defaults are used when missing)
"#;

#[derive(Debug, Parser)]
#[command(
    name = "reloj-client",
    version,
    about = "Terminal client for the Reloj clock backend",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Backend URL override (e.g., http://127.0.0.1:5000)
    #[arg(long, global = true)]
    pub server: Option<String>,
    /// Optional subcommand. Without one, runs `watch`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch alarms and the running timer; notify when they go off
    Watch,
    /// Manage alarms
    Alarm {
        #[command(subcommand)]
        action: AlarmCommand,
    },
    /// Control the countdown timer
    Timer {
        #[command(subcommand)]
        action: TimerCommand,
    },
    /// Control the stopwatch
    Stopwatch {
        #[command(subcommand)]
        action: StopwatchCommand,
    },
    /// Show the time in selected cities
    World {
        /// Cities to show. Falls back to `cities` from config.
        cities: Vec<String>,
        /// Show every city the backend knows
        #[arg(long, conflicts_with = "cities")]
        all: bool,
        /// Keep refreshing until interrupted
        #[arg(long)]
        follow: bool,
    },
    /// List the cities available for the world clock
    Cities,
    /// Write the effective config to the resolved config path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show time and weather for a city
    Env {
        /// City name. Falls back to `env_city` from config.
        city: Option<String>,
        /// Keep refreshing until interrupted
        #[arg(long)]
        follow: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum AlarmCommand {
    /// List alarms
    List,
    /// Add an alarm at HH:MM local time
    Add {
        time: String,
        #[arg(long)]
        label: Option<String>,
    },
    /// Remove an alarm by id
    Remove { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum TimerCommand {
    /// Start a countdown of the given minutes
    Start {
        minutes: u64,
        /// Show the countdown until it finishes
        #[arg(long)]
        follow: bool,
    },
    Stop,
    Reset,
    Status,
}

#[derive(Debug, Subcommand)]
pub enum StopwatchCommand {
    Start {
        /// Show elapsed time until interrupted
        #[arg(long)]
        follow: bool,
    },
    Stop,
    Reset,
    Status,
}
