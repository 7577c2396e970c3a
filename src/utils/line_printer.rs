use crate::{
    threads::file_logger_thread::LogLine,
    utils::error::{LoggerError, LoggerResult},
};
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, io::Write, sync::mpsc::Sender};

pub const DATE_TIME_FMT: &str = "%y-%m-%d %H:%M:%S%.3f";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Invalid UTF-8 sequences become U+FFFD.
    #[default]
    Replace,
    /// Invalid UTF-8 is reported and the raw bytes are printed escaped.
    Strict,
}

pub fn decode_line(raw: &[u8], policy: DecodePolicy) -> LoggerResult<String> {
    match policy {
        DecodePolicy::Replace => Ok(String::from_utf8_lossy(raw).trim().to_string()),
        DecodePolicy::Strict => std::str::from_utf8(raw)
            .map(|text| text.trim().to_string())
            .map_err(|source| LoggerError::Decode {
                len: raw.len(),
                source,
            }),
    }
}

/// Renders bytes as a `b'...'` literal, escaping anything outside printable ASCII.
pub fn escape_bytes(raw: &[u8]) -> String {
    let mut escaped = String::with_capacity(raw.len() + 3);
    escaped.push_str("b'");
    for &byte in raw {
        match byte {
            b'\\' => escaped.push_str("\\\\"),
            b'\'' => escaped.push_str("\\'"),
            b'\t' => escaped.push_str("\\t"),
            b'\n' => escaped.push_str("\\n"),
            b'\r' => escaped.push_str("\\r"),
            0x20..=0x7e => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    escaped.push('\'');
    escaped
}

pub struct LinePrinter<W: Write> {
    out: W,
    policy: DecodePolicy,
    line_sender: Option<Sender<LogLine>>,
    printed: usize,
    decode_failures: usize,
}

impl<W: Write> LinePrinter<W> {
    pub fn new(out: W, policy: DecodePolicy, line_sender: Option<Sender<LogLine>>) -> Self {
        Self {
            out,
            policy,
            line_sender,
            printed: 0,
            decode_failures: 0,
        }
    }

    /// Prints a message that is not device output (banners, completion).
    pub fn status(&mut self, msg: impl Display) -> LoggerResult<()> {
        writeln!(self.out, "{}", msg)?;
        Ok(self.out.flush()?)
    }

    /// Decodes and prints one raw line. Empty reads print nothing.
    pub fn push_line(&mut self, raw: &[u8]) -> LoggerResult<()> {
        if raw.is_empty() {
            return Ok(());
        }
        let line = match decode_line(raw, self.policy) {
            Ok(text) => text,
            Err(e) => {
                warn!("[line_printer] {}", e);
                self.decode_failures += 1;
                escape_bytes(raw)
            }
        };
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        self.printed += 1;

        if let Some(sender) = &self.line_sender {
            if sender
                .send(LogLine::Line {
                    instant: Utc::now(),
                    line,
                })
                .is_err()
            {
                debug!("[line_printer] log sink gone, line not logged");
            }
        }
        Ok(())
    }

    pub fn printed(&self) -> usize {
        self.printed
    }

    pub fn decode_failures(&self) -> usize {
        self.decode_failures
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
