use std::io::Write;

use anyhow::Context;
use lexopt::{Arg, Parser};

use crate::{
    args::{self, Configurable, Usage, flags},
    parse::BufReadExt,
    task::{self, Task},
};

const USAGE: &'static str = r#"
Correct the dates of new tasks before they are stored.

Tasks are read as JSON lines and written back, one per line, ready to be
stored. A task with an empty date is due today. A task dated in the past is
moved up to today.

A task is rejected when it has no title, when its date isn't in `YYYYMMDD`
form or when its repeat rule is invalid. Rejected tasks are never corrected.
Instead, an error is written in place of the task and processing continues:
`{"id":"1","error":"task title is required"}`.

With `-e/--edit`, tasks are instead checked as edits of stored tasks. An edited
task must have an id and a `YYYYMMDD` date, which is never filled in or moved.
Valid tasks are written back unchanged.

Input that isn't valid JSON stops processing with an error naming the line.

USAGE:
    taskdue normalize [-e] <path>
    taskdue normalize [-e] < line delimited JSON tasks

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Add a task that was due last week:

        $ echo '{"date":"20240713","title":"taxes","repeat":"y"}' \
            | taskdue normalize -n 20240720
        {"date":"20240720","title":"taxes","repeat":"y"}

    %snip-start%

    Tasks with malformed dates are rejected:

        $ echo '{"id":"3","date":"2024-07-13","title":"taxes"}' \
            | taskdue normalize
        {"id":"3","error":"incorrect task date: invalid date `2024-07-13`: expected exactly eight digits in YYYYMMDD form"}

    An edited task keeps its date, even when it is in the past:

        $ echo '{"id":"3","date":"20240713","title":"taxes"}' \
            | taskdue normalize --edit
        {"id":"3","date":"20240713","title":"taxes"}

    %snip-end%
REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    let mut config = Config::default();
    let mut input = flags::FileOrStdin::default();
    let mut now = flags::Now::default();
    args::configure(p, USAGE, &mut [&mut config, &mut input, &mut now])?;

    let today = now.get();
    let mut wtr = std::io::stdout().lock();
    input.reader()?.for_byte_line(|line| {
        if line.is_blank() {
            return Ok(true);
        }
        let task: Task = serde_json::from_slice(line.content())
            .with_context(|| {
                format!("line {} of {}", line.number(), input.display())
            })?;
        let id = task.id.clone();
        let checked = if config.edit {
            task::validate_update(&task).map(|()| task)
        } else {
            task::normalize(today, task)
        };
        match checked {
            Ok(task) => {
                log::debug!("task `{id}` is due on {}", task.date);
                serde_json::to_writer(&mut wtr, &task)?;
            }
            Err(err) => {
                log::debug!("task `{id}` rejected: {err}");
                let rejected = Rejected { id: &id, error: err.to_string() };
                serde_json::to_writer(&mut wtr, &rejected)?;
            }
        }
        writeln!(wtr)?;
        Ok(true)
    })
}

/// The JSON record written in place of a rejected task.
#[derive(Debug, serde::Serialize)]
struct Rejected<'a> {
    id: &'a str,
    error: String,
}

#[derive(Debug, Default)]
struct Config {
    edit: bool,
}

impl Configurable for Config {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('e') | Arg::Long("edit") => {
                self.edit = true;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const EDIT: Usage = Usage::flag(
            "-e/--edit",
            "Check edits of stored tasks instead of new tasks.",
            r#"
Check tasks as edits of tasks already stored. Each task must have an id, a
`YYYYMMDD` date, a valid repeat rule (or none) and a title, checked in that
order. Nothing is corrected: a date in the past is kept as given and an empty
date is rejected. `-n/--now` has no effect.
"#,
        );
        &[EDIT]
    }
}
