// A small logger for the `log` crate that writes to stderr. Filtering is done
// entirely through `log::set_max_level`.

use std::{
    path::{Path, PathBuf},
    sync::{LazyLock, Mutex},
};

use {jiff::tz::TimeZone, log::Log};

use crate::style::Theme;

/// A logger that writes one line per record to stderr.
///
/// Each line is `timestamp|LEVEL|file:line: message`. The timestamp is in UTC
/// until a time zone is set with `Logger::set_time_zone`.
#[derive(Debug)]
pub struct Logger {
    tz: Mutex<Option<TimeZone>>,
}

impl Logger {
    /// Create a new logger and install it as the global logger.
    pub fn init() -> Result<&'static Logger, log::SetLoggerError> {
        let logger = Box::leak(Box::new(Logger { tz: Mutex::new(None) }));
        log::set_logger(logger)?;
        Ok(logger)
    }

    pub fn set_time_zone(&self, tz: TimeZone) {
        // A poisoned lock only means another thread panicked while logging.
        let mut guard = self.tz.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(tz);
    }

    fn timestamp(&self) -> String {
        // N.B. `Timestamp::now()` and `to_zoned` don't log, so there's no
        // recursion here. `Zoned::now()` could, since it may read the system
        // time zone from disk.
        let ts = jiff::Timestamp::now();
        let guard = self.tz.lock().unwrap_or_else(|e| e.into_inner());
        match *guard {
            Some(ref tz) => ts.to_zoned(tz.clone()).to_string(),
            None => ts.to_string(),
        }
    }
}

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let theme = Theme::stderr();
        let now = theme.highlight(self.timestamp());
        let level = theme.level(record.level());
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => {
                eprintln!(
                    "{now}|{level}|{}:{line}: {}",
                    relative(file),
                    record.args(),
                );
            }
            (Some(file), None) => {
                eprintln!("{now}|{level}|{}: {}", relative(file), record.args());
            }
            _ => {
                eprintln!("{now}|{level}: {}", record.args());
            }
        }
    }

    fn flush(&self) {
        // `eprintln!` is unbuffered.
    }
}

fn relative(path: &str) -> &str {
    static CWD: LazyLock<Option<PathBuf>> =
        LazyLock::new(|| std::env::current_dir().ok());

    let Some(cwd) = CWD.as_deref() else { return path };
    Path::new(path)
        .strip_prefix(cwd)
        .ok()
        .and_then(|relative| relative.to_str())
        .unwrap_or(path)
}
