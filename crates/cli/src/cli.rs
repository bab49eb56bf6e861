//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// hubctl - sensor hub bring-up and event streaming
#[derive(Parser, Debug)]
#[command(
    name = "hubctl",
    author,
    version,
    about = "Sensor hub bring-up and event streaming",
    long_about = "Brings up an IIO sensor hub, enables the configured sensors and streams \n\
                  decoded events. Captured raw streams can be decoded offline."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "HUBCTL_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "HUBCTL_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default filter derived from `-v` / `-q`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring up the hub and stream events
    Run(RunArgs),

    /// Decode a captured raw event stream
    Decode(DecodeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the sensor table
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "hub.toml", env = "HUBCTL_CONFIG")]
    pub config: PathBuf,

    /// Stop after this many sensor events (0 = unlimited)
    #[arg(long, default_value = "0", env = "HUBCTL_MAX_EVENTS")]
    pub max_events: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "HUBCTL_TIMEOUT")]
    pub timeout: u64,

    /// Override events requested per drain call
    #[arg(long)]
    pub drain_capacity: Option<usize>,

    /// Override metrics port from configuration
    #[arg(long, env = "HUBCTL_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Event output
    #[arg(long, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Channel buffer size between the drain thread and the printer
    #[arg(long, default_value = "256")]
    pub buffer_size: usize,
}

/// Arguments for the `decode` command
#[derive(Parser, Debug, Clone)]
pub struct DecodeArgs {
    /// Captured raw stream (concatenated 24-byte records)
    pub capture: PathBuf,

    /// Stop after this many sensor events (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max_events: u64,

    /// Events requested per drain call
    #[arg(long, default_value = "64")]
    pub drain_capacity: usize,

    /// Event output
    #[arg(long, value_enum, default_value = "json")]
    pub output: OutputFormat,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "hub.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for contracts::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => contracts::LogFormat::Json,
            LogFormat::Pretty => contracts::LogFormat::Pretty,
            LogFormat::Compact => contracts::LogFormat::Compact,
        }
    }
}

/// How events are written
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line on stdout
    #[default]
    Json,
    /// Structured log lines
    Log,
    /// Nothing, statistics only
    None,
}
