// Common Baud Rates:
// 110, 300, 600, 1200, 2400, 4800, 9600, 14400,
// 19200, 38400, 57600, 115200, 128000 and 256000

use clap::Parser;
use serial_line_logger::{config::cli::Cli, main_thread::main_cli};
use std::process::ExitCode;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match main_cli(&cli) {
        Err(e) => {
            println!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}
