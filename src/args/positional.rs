use {anyhow::Context, bstr::ByteSlice};

use crate::{
    args::{Configurable, Usage},
    date::Date,
    parse::BufReadExt,
    rule::RecurrenceRule,
};

/// Arguments read either as positional arguments on the CLI, or as line
/// delimited data on `stdin`.
///
/// This greedily consumes all remaining positional arguments. When there are
/// _zero_ positional arguments, lines are read from stdin instead. Arguments
/// must be valid UTF-8.
#[derive(Clone, Debug)]
pub struct Arguments {
    positional: Vec<String>,
    usage: [Usage; 1],
}

impl Arguments {
    /// Creates an empty set of arguments, documented by the given usage.
    pub fn new(usage: Usage) -> Arguments {
        Arguments { positional: vec![], usage: [usage] }
    }

    /// Run the given function over each argument.
    ///
    /// When reading from stdin, each line is given without its terminator,
    /// and errors are annotated with the line number.
    ///
    /// Iteration stops when the closure returns false or returns an error.
    pub fn try_map(
        self,
        mut f: impl FnMut(&str) -> anyhow::Result<bool>,
    ) -> anyhow::Result<()> {
        if !self.positional.is_empty() {
            for arg in self.positional.iter() {
                if !f(arg)? {
                    break;
                }
            }
            return Ok(());
        }
        std::io::stdin().lock().for_byte_line(|line| {
            let content = line.content().to_str().with_context(|| {
                format!("line {} of <stdin> is not valid UTF-8", line.number())
            })?;
            f(content)
                .with_context(|| format!("line {} of <stdin>", line.number()))
        })
    }
}

impl Configurable for Arguments {
    fn configure(
        &mut self,
        _: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            lexopt::Arg::Value(ref mut v) => {
                let v = std::mem::take(v);
                let string = v.into_string().map_err(|arg| {
                    anyhow::anyhow!(
                        "taskdue requires that positional arguments \
                         be valid UTF-8, but `{arg:?}` is not",
                    )
                })?;
                self.positional.push(string);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        &self.usage
    }
}

/// The two positional arguments describing a recurring task: its date, then
/// its repeat rule.
///
/// Both are kept as written, since the calculator reports its own errors for
/// them.
#[derive(Clone, Debug, Default)]
pub struct DateAndRule {
    date: Option<String>,
    rule: Option<String>,
}

impl DateAndRule {
    /// Returns the date and rule, in that order.
    pub fn get(&self) -> anyhow::Result<(&str, &str)> {
        match (self.date.as_deref(), self.rule.as_deref()) {
            (Some(date), Some(rule)) => Ok((date, rule)),
            (None, _) => anyhow::bail!("missing required <date> argument"),
            (Some(_), None) => {
                anyhow::bail!("missing required <repeat> argument")
            }
        }
    }
}

impl Configurable for DateAndRule {
    fn configure(
        &mut self,
        _: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        let lexopt::Arg::Value(ref mut v) = *arg else { return Ok(false) };
        let value = std::mem::take(v).into_string().map_err(|arg| {
            anyhow::anyhow!(
                "taskdue requires that positional arguments \
                 be valid UTF-8, but `{arg:?}` is not",
            )
        })?;
        if self.date.is_none() {
            self.date = Some(value);
        } else if self.rule.is_none() {
            self.rule = Some(value);
        } else {
            anyhow::bail!("unexpected extra argument `{value}`");
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        &[Date::ARG, RecurrenceRule::ARG]
    }
}
