mod check;
mod done;
mod next;
mod normalize;
mod seq;

const USAGE: &'static str = "\
Compute due dates for recurring tasks.

USAGE:
    taskdue <command> ...

COMMANDS:
    check      Validate repeat rules
    done       Decide what happens to tasks marked as done
    next       Print the next date of a recurring task
    normalize  Correct the dates of new tasks
    seq        Generate the upcoming dates of a recurring task
";

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    // For convenience, running `taskdue` with no arguments prints the date
    // that every other command treats as today.
    if p.try_raw_args().map_or(false, |args| args.as_slice().is_empty()) {
        use std::io::Write;

        let today = crate::date::Date::from(*crate::TODAY);
        writeln!(std::io::stdout(), "{today}")?;
        return Ok(());
    }

    let cmd = crate::args::next_as_command(USAGE, p)?;
    match &*cmd {
        "check" => check::run(p),
        "done" => done::run(p),
        "next" => next::run(p),
        "normalize" => normalize::run(p),
        "seq" => seq::run(p),
        unk => anyhow::bail!("unrecognized command '{}'", unk),
    }
}

/// An error type indicating failure without anything to report.
///
/// `main` sniffs this out via downcasting and exits with a non-zero code
/// without printing anything.
#[derive(Debug)]
pub struct Silent;

impl std::fmt::Display for Silent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "failed silently")
    }
}

impl std::error::Error for Silent {}
