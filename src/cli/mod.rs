//! CLI Module
//!
//! Command-line interface for driving a transport against the real clock.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Playhead - drive a transport controller and print its output
#[derive(Parser, Debug)]
#[command(name = "playhead")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Tick rate in Hz (overrides the configuration file)
    #[arg(long, global = true)]
    pub fps: Option<f64>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print one JSON object per line instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play from zero for a while, then pause
    #[command(name = "play")]
    Play {
        /// How long to play, in seconds
        #[arg(short, long, default_value_t = 1.0, value_parser = parse_seconds)]
        seconds: f64,
    },

    /// Animate the playhead to a target time
    #[command(name = "animate")]
    Animate {
        /// Target time in milliseconds
        #[arg(long)]
        to_ms: u64,

        /// Animation duration in milliseconds (configured default if omitted)
        #[arg(long)]
        duration_ms: Option<u64>,
    },

    /// Jump the playhead to a target time
    #[command(name = "jump")]
    Jump {
        /// Target time in milliseconds
        #[arg(long)]
        to_ms: u64,
    },
}

/// Accept only lengths a `Duration` can hold.
fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("{} is not a finite, non-negative number of seconds", value));
    }
    std::time::Duration::try_from_secs_f64(seconds).map_err(|e| format!("{}", e))?;
    Ok(seconds)
}
