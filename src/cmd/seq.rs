use std::io::Write;

use lexopt::{Arg, Parser};

use crate::{
    args::{self, Configurable, Usage, flags, positional},
    date::{Date, DateFlexible},
    next,
    rule::RecurrenceRule,
};

const USAGE: &'static str = r#"
Generate the upcoming dates of a recurring task.

The first date printed is the one `taskdue next` would print. Each following
date is the next one selected by the repeat rule after the previous date.

Unless the `-c/--count` or `-u/--until` flags are used, this command will
generate dates until taskdue's maximum date is reached. In lieu of
`-c/--count`, users may also choose to use programs like `head` to limit the
output.

USAGE:
    taskdue seq <date> <repeat>

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Print the next three paydays, on the 15th and the last day of the month:

        $ taskdue seq -n 20240101 -c 3 20240101 'm 15,-1'
        20240115
        20240131
        20240215

    %snip-start%

    Print every February 29 up to 2040, for a task first due in 2024:

        $ taskdue seq -n 20240101 -u 20400101 20240229 'm 29 2'
        20240229
        20280229
        20320229
        20360229

    A yearly task on February 29 falls on February 28 in other years:

        $ taskdue seq -n 20240301 -c 5 20240229 y
        20250228
        20260228
        20270228
        20280229
        20290228

    %snip-end%
REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    let mut config = Config::default();
    let mut task = positional::DateAndRule::default();
    let mut now = flags::Now::default();
    args::configure(p, USAGE, &mut [&mut config, &mut task, &mut now])?;

    let (anchor, rule) = task.get()?;
    let rule: RecurrenceRule = rule.parse().map_err(next::Error::InvalidRule)?;
    let anchor: Date = anchor.parse().map_err(next::Error::InvalidAnchorDate)?;
    let mut now = now.get();
    log::debug!(
        "generating dates after {now} from {anchor} for rule `{rule}`, \
         terminating with {:?}",
        config.terminates,
    );

    let mut wtr = std::io::stdout().lock();
    let mut count = 0;
    loop {
        if let Termination::Count(limit) = config.terminates {
            if count >= limit {
                break;
            }
        }
        let next = match rule.next_after(now, anchor) {
            Ok(next) => next,
            // Running off the end of the calendar ends the sequence.
            Err(next::Error::OutOfRange(msg)) if count > 0 => {
                log::debug!("stopping sequence: {msg}");
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if let Termination::Until(until) = config.terminates {
            if next > until {
                break;
            }
        }
        writeln!(wtr, "{next}")?;
        count += 1;
        now = next;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Config {
    terminates: Termination,
}

impl Configurable for Config {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('c') | Arg::Long("count") => {
                anyhow::ensure!(
                    !matches!(self.terminates, Termination::Until(_)),
                    "-c/--count cannot be used with -u/--until",
                );
                let count: usize = args::parse(p, "-c/--count")?;
                self.terminates = Termination::Count(count);
            }
            Arg::Short('u') | Arg::Long("until") => {
                anyhow::ensure!(
                    !matches!(self.terminates, Termination::Count(_)),
                    "-u/--until cannot be used with -c/--count",
                );
                let until: DateFlexible = args::parse(p, "-u/--until")?;
                self.terminates = Termination::Until(until.get());
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const COUNT: Usage = Usage::flag(
            "-c/--count <number>",
            "Stop after this many dates have been generated.",
            r#"
Stop after this many dates have been generated.

This cannot be used with -u/--until.
"#,
        );
        const UNTIL: Usage = Usage::flag(
            "-u/--until <date>",
            "Stop after generating the last date on or before this one.",
            r#"
Stop after generating the last date on or before this one.

This accepts the same formats as -n/--now. This cannot be used with
-c/--count.
"#,
        );
        &[COUNT, UNTIL]
    }
}

/// When a sequence of dates stops.
#[derive(Clone, Copy, Debug, Default)]
enum Termination {
    /// Only at the end of the supported range of dates.
    #[default]
    Never,
    /// After the last date on or before this one.
    Until(Date),
    /// After this many dates.
    Count(usize),
}
