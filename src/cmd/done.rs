use std::io::Write;

use anyhow::Context;

use crate::{
    args::{self, flags},
    date::Date,
    parse::BufReadExt,
    task::{self, Task},
};

const USAGE: &'static str = r#"
Decide what happens to tasks that are marked as done.

Tasks are read as JSON lines. For each task, one JSON object is written
describing what should happen to it:

A task without a repeat rule is deleted: `{"id":"1","action":"delete"}`.

A task with a repeat rule is rescheduled to its next date after today:
`{"id":"1","action":"reschedule","date":"20240727"}`.

When the next date can't be computed, for example because the task's repeat
rule is invalid, an error is written instead and processing continues:
`{"id":"1","error":"incorrect repeat rule: ..."}`.

Input that isn't valid JSON stops processing with an error naming the line.

USAGE:
    taskdue done <path>
    taskdue done < line delimited JSON tasks

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Mark a weekly task as done:

        $ echo '{"id":"7","date":"20240715","title":"run","repeat":"w 1"}' \
            | taskdue done -n 20240720
        {"id":"7","action":"reschedule","date":"20240722"}

    %snip-start%

    Tasks that don't repeat are deleted:

        $ echo '{"id":"8","date":"20240715","title":"call mom"}' \
            | taskdue done
        {"id":"8","action":"delete"}

    %snip-end%
REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let mut input = flags::FileOrStdin::default();
    let mut now = flags::Now::default();
    args::configure(p, USAGE, &mut [&mut input, &mut now])?;

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
        let outcome = match task::complete(today, &task) {
            Ok(completion) => {
                log::debug!(
                    "task `{}` done on {today}: {completion:?}",
                    task.id,
                );
                Outcome {
                    id: &task.id,
                    action: Some(completion.action()),
                    date: completion.date(),
                    error: None,
                }
            }
            Err(err) => {
                log::debug!("task `{}` could not be completed: {err}", task.id);
                Outcome {
                    id: &task.id,
                    action: None,
                    date: None,
                    error: Some(err.to_string()),
                }
            }
        };
        serde_json::to_writer(&mut wtr, &outcome)?;
        writeln!(wtr)?;
        Ok(true)
    })
}

/// The JSON record written for each task.
#[derive(Debug, serde::Serialize)]
struct Outcome<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}
