//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Gyro Sync - frame synchronizer and sample publisher for KVH fiber-optic gyros
#[derive(Parser, Debug)]
#[command(
    name = "gyro-sync",
    author,
    version,
    about = "KVH gyro frame synchronizer and rate publisher",
    long_about = "Reads the 6-byte frame stream of a KVH fiber-optic gyro, locks onto\n\
                  frame boundaries using the 2-bit phase counter, averages angular\n\
                  rate samples and dispatches timestamped records to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "GYRO_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "GYRO_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gyro pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "GYRO_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read from a configured serial device node
    #[arg(long, env = "GYRO_SYNC_DEVICE", conflicts_with_all = ["file", "stdin", "mock"])]
    pub device: Option<PathBuf>,

    /// Replay a raw capture file
    #[arg(long, conflicts_with_all = ["stdin", "mock"])]
    pub file: Option<PathBuf>,

    /// Restart the capture file from the beginning at end of file
    #[arg(long, requires = "file")]
    pub loop_playback: bool,

    /// Read the byte stream from standard input
    #[arg(long, conflicts_with = "mock")]
    pub stdin: bool,

    /// Generate a synthetic stream instead of reading a device
    #[arg(long)]
    pub mock: bool,

    /// Number of frames the synthetic stream produces (0 = unlimited)
    #[arg(long, requires = "mock")]
    pub mock_frames: Option<u64>,

    /// Samples averaged into each published record
    #[arg(short = 'n', long, env = "GYRO_SYNC_NSAMPLES")]
    pub nsamples: Option<usize>,

    /// Publish channel name
    #[arg(long, env = "GYRO_SYNC_CHANNEL")]
    pub channel: Option<String>,

    /// Log phase counters at every cycle wrap while acquiring
    #[arg(long)]
    pub verbose_sync: bool,

    /// Stop after this many records (0 = unlimited)
    #[arg(long, default_value = "0", env = "GYRO_SYNC_MAX_RECORDS")]
    pub max_records: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "GYRO_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running the pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Capacity of the engine to dispatcher channel
    #[arg(long, default_value = "1024", env = "GYRO_SYNC_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "GYRO_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "gyro.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "gyro.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show engine tuning (lock threshold, time sync filter)
    #[arg(long)]
    pub engine: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
