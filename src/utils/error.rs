use std::{io, path::PathBuf, str::Utf8Error};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("could not open port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("could not list serial ports: {0}")]
    ListPorts(#[source] serialport::Error),

    #[error("read failed on {port}: {source}")]
    Read {
        port: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid utf-8 in {len} byte line: {source}")]
    Decode {
        len: usize,
        #[source]
        source: Utf8Error,
    },

    #[error("bad config: {message}")]
    Config { message: String },

    #[error("console write failed: {0}")]
    Console(#[from] io::Error),

    #[error("log file {path:?}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LoggerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Process exit code reported for this kind of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Open { .. } | Self::ListPorts(_) => 2,
            Self::Read { .. } => 3,
            Self::Config { .. } => 4,
            Self::Log { .. } => 5,
            // the read loop recovers from Decode, so it only shares the output code
            Self::Console(_) | Self::Decode { .. } => 6,
        }
    }
}

pub type LoggerResult<T> = Result<T, LoggerError>;
