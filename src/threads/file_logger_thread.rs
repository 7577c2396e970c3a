use std::{
    fs::{create_dir_all, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::{
    threads::{set_thread_priority, FILE_LOGGER_THREAD_PRIORITY},
    utils::{
        error::{LoggerError, LoggerResult},
        line_printer::DATE_TIME_FMT,
        stop_flag::{new_stop_flag, StopTrigger, StopWatcher},
    },
};

pub const FILE_NAME_TIME_FMT: &str = "%y%m%d_%H%M%S";
const IDLE_SYNC_INTERVAL: Duration = Duration::from_millis(100);

pub enum LogLine {
    Line { instant: DateTime<Utc>, line: String },
    Exit,
}

/// `{dir}/{stem}_{yymmdd_HHMMSS}.log`
pub fn log_file_path(log_dir: &Path, stem: &str, now: DateTime<Utc>) -> PathBuf {
    log_dir.join(format!("{}_{}.log", stem, now.format(FILE_NAME_TIME_FMT)))
}

/// Where the writer thread puts log lines. `sync` runs when the channel goes idle.
pub trait LogSink: Write + Send + 'static {
    fn sync(&mut self) -> io::Result<()>;
}

impl LogSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

pub struct FileLoggerThread {
    file_path: PathBuf,
    trigger: StopTrigger,
    line_sender: Sender<LogLine>,
    join_handle: JoinHandle<LoggerResult<()>>,
}

impl FileLoggerThread {
    /// Opens the log file and starts the writer. If a write ever fails the
    /// writer drops `session_trigger`, which ends the read loop.
    pub fn spawn(log_dir: &Path, stem: &str, session_trigger: StopTrigger) -> LoggerResult<Self> {
        let file_path = log_file_path(log_dir, stem, Utc::now());
        let log_err = |source| LoggerError::Log {
            path: file_path.clone(),
            source,
        };

        create_dir_all(log_dir).map_err(log_err)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .map_err(log_err)?;
        info!("[file_logger_task] opened {:?}", file_path);
        Ok(Self::spawn_sink(file_path, file, session_trigger))
    }

    /// Starts the writer on an already opened sink; `file_path` is only used in messages.
    pub fn spawn_sink<S: LogSink>(
        file_path: PathBuf,
        sink: S,
        session_trigger: StopTrigger,
    ) -> Self {
        let (line_sender, line_receiver) = channel();
        let (watcher, trigger) = new_stop_flag();
        let task_path = file_path.clone();
        Self {
            file_path,
            trigger,
            line_sender,
            join_handle: thread::spawn(move || {
                file_logger_task(watcher, sink, &task_path, line_receiver, session_trigger)
            }),
        }
    }

    pub fn line_sender(&self) -> Sender<LogLine> {
        self.line_sender.clone()
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn join(self) -> LoggerResult<()> {
        let _ = self.line_sender.send(LogLine::Exit);
        self.trigger.stop();
        match self.join_handle.join() {
            Ok(res) => res,
            Err(_) => Err(LoggerError::Log {
                path: self.file_path,
                source: io::Error::new(io::ErrorKind::Other, "file logger thread panicked"),
            }),
        }
    }
}

fn write_line<S: LogSink>(file: &mut S, instant: DateTime<Utc>, line: &str) -> io::Result<()> {
    writeln!(file, "{} {}", instant.format(DATE_TIME_FMT), line)
}

fn file_logger_task<S: LogSink>(
    watcher: StopWatcher,
    mut file: S,
    file_path: &Path,
    line_receiver: Receiver<LogLine>,
    session_trigger: StopTrigger,
) -> LoggerResult<()> {
    set_thread_priority::<FILE_LOGGER_THREAD_PRIORITY>();

    let fail = |source: io::Error| {
        error!("[file_logger_task] {:?} {}", file_path, source);
        LoggerError::Log {
            path: file_path.to_path_buf(),
            source,
        }
    };

    let mut synced = true;
    loop {
        match line_receiver.recv_timeout(IDLE_SYNC_INTERVAL) {
            Ok(LogLine::Line { instant, line }) => {
                write_line(&mut file, instant, &line).map_err(fail)?;
                synced = false;
                continue;
            }
            Ok(LogLine::Exit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        if !synced {
            file.sync().map_err(fail)?;
            synced = true;
        }
        if !watcher.should_run() {
            break;
        }
    }

    // lines queued before Exit still belong in the file
    while let Ok(LogLine::Line { instant, line }) = line_receiver.try_recv() {
        write_line(&mut file, instant, &line).map_err(fail)?;
    }
    file.sync().map_err(fail)?;
    drop(session_trigger);

    Ok(debug!("[file_logger_task] end {:?}", file_path))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    /// A sink on a disk that has run out of space.
    pub(crate) struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogSink for FullDisk {
        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn file_name_uses_stem_and_start_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = log_file_path(Path::new("logs"), "cu.usbmodem202201", now);
        assert_eq!(path, Path::new("logs/cu.usbmodem202201_240309_140507.log"));
    }

    #[test]
    fn writes_timestamped_lines_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let (session_watcher, session_trigger) = new_stop_flag();
        let logger = FileLoggerThread::spawn(dir.path(), "ttyACM0", session_trigger).unwrap();

        let sender = logger.line_sender();
        let instant = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        sender
            .send(LogLine::Line {
                instant,
                line: "I (312) ESP_HUE: Joined Network".into(),
            })
            .unwrap();
        sender
            .send(LogLine::Line {
                instant,
                line: "second".into(),
            })
            .unwrap();

        let path = logger.file_path().to_path_buf();
        logger.join().unwrap();
        assert!(!session_watcher.should_run());

        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(
            contents,
            "24-03-09 14:05:07.000 I (312) ESP_HUE: Joined Network\n\
             24-03-09 14:05:07.000 second\n"
        );
    }

    #[test]
    fn write_failure_stops_the_session() {
        let (session_watcher, session_trigger) = new_stop_flag();
        let logger = FileLoggerThread::spawn_sink("full.log".into(), FullDisk, session_trigger);
        logger
            .line_sender()
            .send(LogLine::Line {
                instant: Utc::now(),
                line: "Servo: ON".into(),
            })
            .unwrap();

        let mut waited = Duration::ZERO;
        while session_watcher.should_run() && waited < Duration::from_secs(5) {
            thread::sleep(IDLE_SYNC_INTERVAL);
            waited += IDLE_SYNC_INTERVAL;
        }
        assert!(!session_watcher.should_run());
        let err = logger.join().unwrap_err();
        assert!(matches!(err, LoggerError::Log { ref path, .. } if path == Path::new("full.log")));
    }
}
