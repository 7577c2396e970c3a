use crate::utils::{
    error::{LoggerError, LoggerResult},
    line_printer::LinePrinter,
    stop_flag::StopWatcher,
};
use log::{debug, info};
use serialport::SerialPort;
use std::{
    io::{self, Read, Write},
    time::{Duration, Instant},
};

pub const BUFFER_SIZE: usize = 0x1000;

fn ends_attempt(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Splits a byte stream into `\n` terminated lines, one bounded attempt at a time.
pub struct LineReader<R: Read> {
    inner: R,
    read_timeout: Duration,
    pending: Vec<u8>,
    read_buf: Box<[u8]>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R, read_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
            pending: Vec::new(),
            read_buf: vec![0u8; BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the next line including its `\n`, or whatever arrived before
    /// the read timeout ran out. An empty vec means nothing arrived.
    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + self.read_timeout;
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                return Ok(self.pending.drain(..=pos).collect());
            }
            if Instant::now() >= deadline {
                break;
            }
            match self.inner.read(&mut self.read_buf) {
                Ok(0) => break,
                Ok(count) => self.pending.extend_from_slice(&self.read_buf[..count]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if ends_attempt(&e) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(std::mem::take(&mut self.pending))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub lines: usize,
    pub decode_failures: usize,
    pub elapsed: Duration,
}

pub struct SerialSession<R: Read = Box<dyn SerialPort>> {
    port_name: String,
    reader: LineReader<R>,
}

impl SerialSession {
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> LoggerResult<Self> {
        let serial_port = serialport::new(port_name, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|source| LoggerError::Open {
                port: port_name.to_string(),
                source,
            })?;
        info!("[serial_session] opened {} at {}", port_name, baud_rate);
        Ok(Self::from_reader(port_name, serial_port, read_timeout))
    }
}

impl<R: Read> SerialSession<R> {
    pub fn from_reader(port_name: &str, inner: R, read_timeout: Duration) -> Self {
        Self {
            port_name: port_name.to_string(),
            reader: LineReader::new(inner, read_timeout),
        }
    }

    /// Reads and prints lines until `duration` has elapsed, `keep_running`
    /// is stopped, or a read fails.
    pub fn run<W: Write>(
        &mut self,
        printer: &mut LinePrinter<W>,
        duration: Duration,
        keep_running: &StopWatcher,
    ) -> LoggerResult<SessionReport> {
        let started = Instant::now();
        let printed_before = printer.printed();
        let failures_before = printer.decode_failures();

        while started.elapsed() < duration && keep_running.should_run() {
            let raw = self.reader.read_line().map_err(|source| LoggerError::Read {
                port: self.port_name.clone(),
                source,
            })?;
            printer.push_line(&raw)?;
        }

        Ok(SessionReport {
            lines: printer.printed() - printed_before,
            decode_failures: printer.decode_failures() - failures_before,
            elapsed: started.elapsed(),
        })
    }

    /// Dropping the session also closes the port; this just makes it explicit.
    pub fn close(self) {
        debug!("[serial_session] closed {}", self.port_name);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utils::{line_printer::DecodePolicy, stop_flag::new_stop_flag};
    use std::{collections::VecDeque, thread};

    /// Replays scripted chunks, then behaves like an idle port.
    pub(crate) struct ScriptedPort {
        script: VecDeque<io::Result<Vec<u8>>>,
        idle: Duration,
    }

    impl ScriptedPort {
        pub(crate) fn new(idle: Duration) -> Self {
            Self {
                script: VecDeque::new(),
                idle,
            }
        }

        pub(crate) fn chunk(mut self, bytes: &[u8]) -> Self {
            self.script.push_back(Ok(bytes.to_vec()));
            self
        }

        pub(crate) fn fail(mut self, kind: io::ErrorKind) -> Self {
            self.script.push_back(Err(io::Error::new(kind, "scripted")));
            self
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.script.pop_front() {
                Some(Ok(bytes)) => {
                    let count = bytes.len().min(buf.len());
                    buf[..count].copy_from_slice(&bytes[..count]);
                    if count < bytes.len() {
                        self.script.push_front(Ok(bytes[count..].to_vec()));
                    }
                    Ok(count)
                }
                Some(Err(e)) => Err(e),
                None => {
                    thread::sleep(self.idle);
                    Err(io::Error::new(io::ErrorKind::TimedOut, "Operation timed out"))
                }
            }
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(20);

    #[test]
    fn reassembles_line_split_across_chunks() {
        let port = ScriptedPort::new(TIMEOUT).chunk(b"HEL").chunk(b"LO\n");
        let mut reader = LineReader::new(port, Duration::from_secs(1));
        assert_eq!(reader.read_line().unwrap(), b"HELLO\n");
    }

    #[test]
    fn keeps_bytes_after_newline_for_next_attempt() {
        let port = ScriptedPort::new(TIMEOUT).chunk(b"one\ntwo\nthr");
        let mut reader = LineReader::new(port, TIMEOUT);
        assert_eq!(reader.read_line().unwrap(), b"one\n");
        assert_eq!(reader.read_line().unwrap(), b"two\n");
        assert_eq!(reader.read_line().unwrap(), b"thr");
        assert!(reader.read_line().unwrap().is_empty());
    }

    #[test]
    fn timeout_returns_partial_line() {
        let port = ScriptedPort::new(TIMEOUT)
            .chunk(b"partial")
            .fail(io::ErrorKind::TimedOut);
        let mut reader = LineReader::new(port, Duration::from_secs(1));
        assert_eq!(reader.read_line().unwrap(), b"partial");
    }

    #[test]
    fn interrupted_read_is_retried() {
        let port = ScriptedPort::new(TIMEOUT)
            .fail(io::ErrorKind::Interrupted)
            .chunk(b"ok\n");
        let mut reader = LineReader::new(port, Duration::from_secs(1));
        assert_eq!(reader.read_line().unwrap(), b"ok\n");
    }

    #[test]
    fn hard_read_error_is_surfaced() {
        let port = ScriptedPort::new(TIMEOUT).fail(io::ErrorKind::BrokenPipe);
        let mut reader = LineReader::new(port, TIMEOUT);
        let err = reader.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn run_prints_lines_until_duration_elapses() {
        let port = ScriptedPort::new(TIMEOUT).chunk(b"HELLO\n").chunk(b"\xffx\r\n");
        let mut session = SerialSession::from_reader("/dev/ttyTEST", port, TIMEOUT);
        let mut printer = LinePrinter::new(Vec::new(), DecodePolicy::Replace, None);
        let (watcher, _trigger) = new_stop_flag();

        let duration = Duration::from_millis(150);
        let report = session.run(&mut printer, duration, &watcher).unwrap();

        assert_eq!(report.lines, 2);
        assert_eq!(report.decode_failures, 0);
        assert!(report.elapsed >= duration);
        assert!(report.elapsed < duration + Duration::from_secs(1));
        let out = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(out, "HELLO\n\u{fffd}x\n");
    }

    #[test]
    fn run_stops_when_flag_is_cleared() {
        let port = ScriptedPort::new(TIMEOUT);
        let mut session = SerialSession::from_reader("/dev/ttyTEST", port, TIMEOUT);
        let mut printer = LinePrinter::new(Vec::new(), DecodePolicy::Replace, None);
        let (watcher, trigger) = new_stop_flag();
        trigger.stop();

        let report = session
            .run(&mut printer, Duration::from_secs(30), &watcher)
            .unwrap();
        assert_eq!(report.lines, 0);
        assert!(report.elapsed < Duration::from_secs(1));
    }

    #[test]
    fn run_ends_with_read_error() {
        let port = ScriptedPort::new(TIMEOUT)
            .chunk(b"last words\n")
            .fail(io::ErrorKind::BrokenPipe);
        let mut session = SerialSession::from_reader("/dev/ttyTEST", port, TIMEOUT);
        let mut printer = LinePrinter::new(Vec::new(), DecodePolicy::Replace, None);
        let (watcher, _trigger) = new_stop_flag();

        let err = session
            .run(&mut printer, Duration::from_secs(5), &watcher)
            .unwrap_err();
        assert!(matches!(err, LoggerError::Read { ref port, .. } if port == "/dev/ttyTEST"));
        assert_eq!(printer.printed(), 1);
    }
}
