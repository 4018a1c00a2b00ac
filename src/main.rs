use std::{env, io::Write, process::ExitCode, sync::LazyLock};

use jiff::{Timestamp, civil, tz::TimeZone};

mod args;
mod cmd;
mod date;
mod logger;
mod next;
mod parse;
mod rule;
mod style;
mod task;

static TZ: LazyLock<TimeZone> = LazyLock::new(|| TimeZone::system());

/// The date relative to which every computed date must be in the future,
/// unless a command is given an explicit `-n/--now`.
static TODAY: LazyLock<civil::Date> = LazyLock::new(|| {
    let system_today = || Timestamp::now().to_zoned(TZ.clone()).date();
    match read_env_taskdue_now() {
        Ok(Some(date)) => {
            log::trace!(
                "setting today to `{date}` from `TASKDUE_NOW` \
                 environment variable",
            );
            date.get()
        }
        Ok(None) => {
            let today = system_today();
            log::trace!(
                "`TASKDUE_NOW` environment variable not set, using \
                 current date `{today}`",
            );
            today
        }
        Err(err) => {
            let today = system_today();
            log::warn!(
                "reading `TASKDUE_NOW` failed, using current date \
                 `{today}`: {err:#}",
            );
            today
        }
    }
});

fn main() -> ExitCode {
    let Err(err) = run() else { return ExitCode::SUCCESS };
    if let Some(help) = err.root_cause().downcast_ref::<args::Help>() {
        writeln!(&mut std::io::stdout(), "{help}").unwrap();
        return ExitCode::SUCCESS;
    }
    if let Some(version) = err.root_cause().downcast_ref::<args::Version>() {
        writeln!(&mut std::io::stdout(), "{version}").unwrap();
        return ExitCode::SUCCESS;
    }
    if err.root_cause().downcast_ref::<cmd::Silent>().is_some() {
        return ExitCode::from(1);
    }
    // A closed pipe, e.g., from `taskdue seq ... | head`, isn't a failure.
    // Note that `serde_json` swallows the `std::io::Error`, so it needs its
    // own check.
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<std::io::Error>() {
            if err.kind() == std::io::ErrorKind::BrokenPipe {
                return ExitCode::SUCCESS;
            }
        }
        if let Some(err) = cause.downcast_ref::<serde_json::Error>() {
            if err.io_error_kind() == Some(std::io::ErrorKind::BrokenPipe) {
                return ExitCode::SUCCESS;
            }
        }
    }
    if std::env::var("RUST_BACKTRACE").map_or(false, |v| v == "1")
        && std::env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        writeln!(&mut std::io::stderr(), "{:?}", err).unwrap();
    } else {
        writeln!(&mut std::io::stderr(), "{:#}", err).unwrap();
    }
    ExitCode::from(1)
}

fn run() -> anyhow::Result<()> {
    let level = match &*env::var("TASKDUE_LOG").unwrap_or_default() {
        "" | "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        unk => anyhow::bail!("unrecognized log level '{}'", unk),
    };
    log::set_max_level(level);
    // The logger starts out printing timestamps in UTC, since finding the
    // system time zone may itself log. Once `TZ` is initialized, switch to
    // local time.
    let logger = logger::Logger::init()?;
    logger.set_time_zone(TZ.clone());
    cmd::run(&mut lexopt::Parser::from_env())
}

fn read_env_taskdue_now() -> anyhow::Result<Option<date::Date>> {
    let Some(val) = std::env::var_os("TASKDUE_NOW") else { return Ok(None) };
    let Some(val) = val.to_str() else {
        anyhow::bail!(
            "`TASKDUE_NOW` environment variable is not valid UTF-8: {val:?}"
        )
    };
    date::parse_date_or_timestamp(val).map(Some)
}
