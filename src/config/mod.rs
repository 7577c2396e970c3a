pub mod cli;
pub mod read_config;

use crate::utils::{
    error::{LoggerError, LoggerResult},
    line_printer::DecodePolicy,
};
use cli::Cli;
use read_config::{read_config_file, ConfigDto};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

pub type BaudRate = u32;
pub const DEFAULT_PORT_NAME: &str = "/dev/cu.usbmodem202201";
pub const DEFAULT_BAUD_RATE: BaudRate = 115_200;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// 5 s capture around a board reset
    #[default]
    Reset,
    /// 60 s capture of a manual test run
    Session,
    /// 90 s capture while watching the LED
    Long,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerTiming {
    BeforeOpen,
    AfterOpen,
}

impl Profile {
    pub fn duration(self) -> Duration {
        match self {
            Profile::Reset => Duration::from_secs(5),
            Profile::Session => Duration::from_secs(60),
            Profile::Long => Duration::from_secs(90),
        }
    }

    pub fn banner(self, duration: Duration) -> String {
        let secs = duration.as_secs_f64();
        match self {
            Profile::Reset => format!(
                "Listening for {} seconds. Please press RESET on the board now!",
                secs
            ),
            Profile::Session => format!(
                "Monitoring for {} seconds. Please perform your test actions (Start -> Wait -> Long Press)...",
                secs
            ),
            Profile::Long => format!(
                "Monitoring for {} seconds. Please observe the LED behavior.",
                secs
            ),
        }
    }

    pub fn banner_timing(self) -> BannerTiming {
        match self {
            Profile::Reset => BannerTiming::AfterOpen,
            Profile::Session | Profile::Long => BannerTiming::BeforeOpen,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub port_name: String,
    pub baud_rate: BaudRate,
    pub read_timeout: Duration,
    pub duration: Duration,
    pub profile: Profile,
    pub decode: DecodePolicy,
    pub log_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

fn positive_secs(what: &str, secs: f64) -> LoggerResult<Duration> {
    let bad = |reason: &str| {
        LoggerError::config(format!("{} {}, got {}", what, reason, secs))
    };
    if !(secs.is_finite() && secs > 0.0) {
        return Err(bad("must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| bad("is too large"))
}

impl SessionConfig {
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            port_name: DEFAULT_PORT_NAME.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            duration: profile.duration(),
            profile,
            decode: DecodePolicy::default(),
            log_dir: None,
        }
    }

    /// Layers defaults, the profile, the config file, then command line flags.
    pub fn resolve(cli: &Cli) -> LoggerResult<Self> {
        let file = match &cli.config {
            Some(path) => read_config_file(path)?,
            None => ConfigDto::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: &Cli, file: ConfigDto) -> LoggerResult<Self> {
        let profile = cli.profile.or(file.profile).unwrap_or_default();
        let mut cfg = Self::for_profile(profile);

        if let Some(port_name) = cli.port.clone().or(file.port_name) {
            cfg.port_name = port_name;
        }
        if let Some(baud_rate) = cli.baud.or(file.baud_rate) {
            cfg.baud_rate = baud_rate;
        }
        if let Some(ms) = cli.timeout_ms.or(file.read_timeout_ms) {
            cfg.read_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = cli.duration.or(file.duration_secs) {
            cfg.duration = positive_secs("duration", secs)?;
        }
        if cli.strict {
            cfg.decode = DecodePolicy::Strict;
        } else if let Some(decode) = file.decode {
            cfg.decode = decode;
        }
        cfg.log_dir = cli.log_dir.clone().or(file.log_dir);

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> LoggerResult<()> {
        if self.port_name.is_empty() {
            return Err(LoggerError::config("port name is empty"));
        }
        if self.baud_rate == 0 {
            return Err(LoggerError::config("baud rate must be positive"));
        }
        if self.read_timeout.is_zero() {
            return Err(LoggerError::config("read timeout must be positive"));
        }
        if self.duration.is_zero() {
            return Err(LoggerError::config("duration must be positive"));
        }
        Ok(())
    }

    pub fn banner(&self) -> String {
        self.profile.banner(self.duration)
    }

    /// Last component of the port path, used to name log files.
    pub fn log_stem(&self) -> String {
        self.port_name
            .rsplit(|c: char| c == '/' || c == '\\')
            .find(|part| !part.is_empty())
            .unwrap_or("serial")
            .to_string()
    }
}
