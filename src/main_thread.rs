use crate::{
    config::{cli::Cli, BannerTiming, SessionConfig},
    ports::list_ports,
    serial_session::{SerialSession, SessionReport},
    threads::file_logger_thread::FileLoggerThread,
    utils::{
        error::LoggerResult,
        line_printer::LinePrinter,
        stop_flag::{new_stop_flag, StopWatcher},
    },
};
use log::info;
use std::io::{stdout, Read, Write};

pub const COMPLETION_MESSAGE: &str = "Monitoring finished.";

/// Entry point behind the binary: either lists ports or runs one session on stdout.
pub fn main_cli(cli: &Cli) -> LoggerResult<()> {
    if cli.list_ports {
        let count = list_ports(&mut stdout().lock())?;
        return Ok(info!("[main_task] {} ports", count));
    }

    let cfg = SessionConfig::resolve(cli)?;
    let report = main_task(&cfg, stdout().lock())?;
    Ok(info!(
        "[main_task] end: {} lines ({} undecodable) in {:.2?}",
        report.lines, report.decode_failures, report.elapsed
    ))
}

pub fn main_task<W: Write>(cfg: &SessionConfig, out: W) -> LoggerResult<SessionReport> {
    main_task_with(cfg, out, |cfg| {
        SerialSession::open(&cfg.port_name, cfg.baud_rate, cfg.read_timeout)
    })
}

/// Runs one session with a caller supplied way of opening the port.
pub fn main_task_with<W, R, F>(cfg: &SessionConfig, out: W, open: F) -> LoggerResult<SessionReport>
where
    W: Write,
    R: Read,
    F: FnOnce(&SessionConfig) -> LoggerResult<SerialSession<R>>,
{
    cfg.validate()?;

    let (session_watcher, session_trigger) = new_stop_flag();
    let (logger, _session_trigger) = match &cfg.log_dir {
        Some(log_dir) => (
            Some(FileLoggerThread::spawn(log_dir, &cfg.log_stem(), session_trigger)?),
            None,
        ),
        None => (None, Some(session_trigger)),
    };

    run_session(cfg, out, logger, &session_watcher, open)
}

/// The completion message is only printed once the log sink has been
/// joined, so a failed log write never reads as a clean finish.
fn run_session<W, R, F>(
    cfg: &SessionConfig,
    out: W,
    logger: Option<FileLoggerThread>,
    keep_running: &StopWatcher,
    open: F,
) -> LoggerResult<SessionReport>
where
    W: Write,
    R: Read,
    F: FnOnce(&SessionConfig) -> LoggerResult<SerialSession<R>>,
{
    let mut printer = LinePrinter::new(
        out,
        cfg.decode,
        logger.as_ref().map(FileLoggerThread::line_sender),
    );
    let res = monitor(cfg, &mut printer, keep_running, open);

    let logged = match logger {
        Some(logger) => logger.join(),
        None => Ok(()),
    };
    let report = res?;
    logged?;

    printer.status(COMPLETION_MESSAGE)?;
    Ok(report)
}

fn monitor<W, R, F>(
    cfg: &SessionConfig,
    printer: &mut LinePrinter<W>,
    keep_running: &StopWatcher,
    open: F,
) -> LoggerResult<SessionReport>
where
    W: Write,
    R: Read,
    F: FnOnce(&SessionConfig) -> LoggerResult<SerialSession<R>>,
{
    let banner = cfg.banner();
    let timing = cfg.profile.banner_timing();

    printer.status(format!("Opening {} at {}...", cfg.port_name, cfg.baud_rate))?;
    if timing == BannerTiming::BeforeOpen {
        printer.status(&banner)?;
    }

    let mut session = open(cfg)?;
    if timing == BannerTiming::AfterOpen {
        printer.status(&banner)?;
    }

    let report = session.run(printer, cfg.duration, keep_running);
    session.close();
    report
}
