//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "feeder", version, about = "Automatic pet feeder controller")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/feeder_config.toml")]
    pub config: PathBuf,

    /// Print results and logs as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Zero the scale; the bowl must be empty
    Tare,
    /// Tare, then derive the scale factor from a known mass
    Calibrate {
        /// Mass of the calibration weight in grams
        #[arg(long)]
        grams: f64,
        /// Store the reciprocal scale (grams per count)
        #[arg(long, action = ArgAction::SetTrue)]
        inverse: bool,
        /// Seconds to wait after the tare while the weight is placed
        #[arg(long, value_name = "SECS", default_value_t = 5)]
        place_delay_s: u64,
    },
    /// Read the net weight in the bowl
    Weight {
        /// Number of consecutive readings
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Dispense until the bowl gained the given amount
    Feed {
        /// Grams to dispense
        #[arg(long)]
        grams: f64,
        /// Give up after this many seconds (default: [feeding].default_timeout_s)
        #[arg(long, value_name = "SECS")]
        timeout_s: Option<u64>,
    },
    /// Turn the auger manually in forward/backward bursts
    Jog {
        /// Forward steps per burst (default: [motor].jog_forward_steps)
        #[arg(long)]
        forward: Option<u32>,
        /// Backward steps per burst (default: [motor].jog_backward_steps)
        #[arg(long)]
        backward: Option<u32>,
        /// Number of bursts (default: [motor].jog_repeats)
        #[arg(long)]
        repeat: Option<u32>,
    },
    /// Hopper fill level from the distance sensor
    Level,
    /// Daily consumption summary
    History {
        /// Number of most recent days to show
        #[arg(long, default_value_t = 7)]
        days: usize,
    },
    /// Sensor state, calibration and motor position
    State,
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
