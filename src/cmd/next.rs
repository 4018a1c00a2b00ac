use std::io::Write;

use lexopt::Parser;

use crate::{
    args::{self, flags, positional},
    next,
};

const USAGE: &'static str = r#"
Print the next date of a recurring task.

The date printed is the first date selected by the repeat rule that is
strictly after the reference date. The reference date is today, unless the
`-n/--now` flag is given.

The rule is checked before the task's date, so an invalid rule is always
reported even when the date is also invalid.

USAGE:
    taskdue next <date> <repeat>

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Find the next date of a task repeating every 7 days:

        $ taskdue next -n 20240126 20240113 'd 7'
        20240127

    %snip-start%

    Find the next Monday or Friday after a Wednesday:

        $ taskdue next -n 20240103 20240101 'w 1,5'
        20240105

    Find the next last day of February, which isn't always the 28th:

        $ taskdue next -n 20240201 20240101 'm -1 2'
        20240229

    %snip-end%
REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    let mut task = positional::DateAndRule::default();
    let mut now = flags::Now::default();
    args::configure(p, USAGE, &mut [&mut task, &mut now])?;

    let (anchor, rule) = task.get()?;
    let now = now.get();
    log::debug!("computing next date of `{anchor}` for rule `{rule}`");
    let next = next::next_date(now, anchor, rule)?;
    log::debug!("next date after {now} is {next}");
    writeln!(std::io::stdout(), "{next}")?;
    Ok(())
}
