use crate::config::Profile;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Print lines from a serial device for a fixed amount of time.
///
/// With no arguments, listens on /dev/cu.usbmodem202201 at 115200 baud
/// for 5 seconds.
#[derive(Parser, Debug, Default)]
#[command(name = "serial-line-logger", version)]
pub struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Per-read timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Run duration in seconds (overrides the profile)
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Preset duration and banner
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,

    /// Print invalid UTF-8 lines as escaped bytes instead of replacing them
    #[arg(long)]
    pub strict: bool,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write timestamped lines to a log file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
