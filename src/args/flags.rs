use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use {
    anyhow::Context,
    lexopt::{Arg, Parser},
};

use crate::{
    TODAY,
    args::{self, Configurable, Usage},
    date::{Date, DateFlexible},
};

/// The `-n/--now` flag, i.e., the date that computed dates must come after.
#[derive(Clone, Debug, Default)]
pub struct Now {
    date: Option<DateFlexible>,
}

impl Now {
    /// Returns the date given by the flag, or today if it wasn't given.
    ///
    /// "Today" respects the `TASKDUE_NOW` environment variable.
    pub fn get(&self) -> Date {
        match self.date {
            Some(date) => date.get(),
            None => Date::from(*TODAY),
        }
    }
}

impl Configurable for Now {
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('n') | Arg::Long("now") => {
                self.date = Some(args::parse(p, "-n/--now")?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        &[DateFlexible::NOW_FLAG]
    }
}

/// A file path or, in its absence, stdin.
///
/// A path of `-` also means stdin.
#[derive(Clone, Debug, Default)]
pub struct FileOrStdin {
    path: Option<PathBuf>,
}

impl FileOrStdin {
    pub const ARG: Usage = Usage::arg(
        "<path>",
        "A file of tasks as JSON lines. Defaults to stdin.",
        r#"
A file of tasks, one JSON object per line.

Each object may have the fields `id`, `date`, `title`, `comment` and `repeat`,
all of which are strings. Missing fields are treated as empty strings. Blank
lines are skipped.

When no path is given (or the path is `-`), tasks are read from stdin.
"#,
    );

    /// Sets the path to the one provided, but only if no path has already been
    /// set.
    pub fn set(&mut self, path: impl Into<PathBuf>) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.path.is_none(),
            "command only accepts a single path",
        );
        let path = path.into();
        if path != Path::new("-") {
            self.path = Some(path);
        }
        Ok(())
    }

    /// When a file, this is its file path. When stdin, it's the literal
    /// string `<stdin>`.
    pub fn display(&self) -> impl std::fmt::Display + '_ {
        self.path.as_deref().unwrap_or_else(|| Path::new("<stdin>")).display()
    }

    pub fn reader(&self) -> anyhow::Result<Box<dyn io::BufRead>> {
        Ok(match self.path {
            Some(ref path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("{}", path.display()))?;
                Box::new(io::BufReader::new(file))
            }
            None => Box::new(io::stdin().lock()),
        })
    }
}

impl Configurable for FileOrStdin {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Value(ref mut v) => {
                self.set(std::mem::take::<OsString>(v))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        &[FileOrStdin::ARG]
    }
}
