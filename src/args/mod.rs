use std::{
    fmt::{Debug, Display, Write},
    str::FromStr,
    sync::LazyLock,
};

use {
    anyhow::Context,
    lexopt::{Arg, Parser, ValueExt},
    regex::Regex,
};

pub mod flags;
pub mod positional;

/// A piece of command line configuration.
///
/// Each command is made up of one or more of these. Every argument is offered
/// to each of them in turn until one claims it.
pub trait Configurable: Debug {
    /// Returns true if this target recognized and consumed the argument.
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool>;

    /// A list of `Usage` documentation for the flags/arguments that this
    /// implementation parses.
    fn usage(&self) -> &[Usage] {
        &[]
    }
}

/// Feeds every remaining argument in `p` to the given targets.
///
/// `-h` and `--help` are handled here by rendering `usage`, with `%args%` and
/// `%flags%` replaced by the docs collected from the targets. Anything
/// between `%snip-start%` and `%snip-end%` only appears in the long form.
pub fn configure(
    p: &mut Parser,
    usage: &str,
    targets: &mut [&mut dyn Configurable],
) -> anyhow::Result<()> {
    static REMOVE_SNIPS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^\s*%snip-start%\p{any}*?%snip-end%\s*$").unwrap()
    });
    static REMOVE_SNIP_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^\s*%snip-(start|end)%\s*$").unwrap()
    });

    while let Some(arg) = p.next()? {
        if matches!(arg, Arg::Short('h') | Arg::Long("help")) {
            let short = arg == Arg::Short('h');
            let args = collect_usage(targets, false);
            let flags = collect_usage(targets, true);
            let rendered = if short {
                REMOVE_SNIPS
                    .replace_all(usage, "")
                    .replace("%args%", &Usage::short(&args))
                    .replace("%flags%", &Usage::short(&flags))
            } else {
                REMOVE_SNIP_MARKERS
                    .replace_all(usage, "")
                    .replace("%args%", &Usage::long(&args))
                    .replace("%flags%", &Usage::long(&flags))
            };
            return Err(Help(rendered.trim().to_string()).into());
        }
        // Detach the argument from the borrow of `p`, so that targets can
        // pull flag values out of the parser.
        let long_flag: Option<String> = match arg {
            Arg::Long(name) => Some(name.to_string()),
            _ => None,
        };
        let mut arg = match (long_flag.as_deref(), arg) {
            (Some(name), _) => Arg::Long(name),
            (None, Arg::Short(c)) => Arg::Short(c),
            (None, Arg::Value(value)) => Arg::Value(value),
            (None, Arg::Long(_)) => unreachable!(),
        };
        let mut recognized = false;
        for t in targets.iter_mut() {
            if t.configure(p, &mut arg)? {
                recognized = true;
                break;
            }
        }
        if !recognized {
            return Err(arg.unexpected().into());
        }
    }
    Ok(())
}

fn collect_usage(targets: &[&mut dyn Configurable], flag: bool) -> Vec<Usage> {
    let mut usages = vec![];
    if flag {
        usages.extend([Help::USAGE, Version::USAGE]);
    }
    for t in targets.iter() {
        usages.extend(t.usage().iter().copied().filter(|u| u.flag == flag));
    }
    // Positional arguments stay in the order they're given on the command
    // line. Flags are sorted by their long name.
    if flag {
        usages.sort_by_key(|u| {
            u.format.split_once('/').map(|(_, long)| long).unwrap_or(u.format)
        });
    }
    usages
}

/// Parses the next argument from the given parser as a command name.
///
/// This also handles `-h/--help` and `--version`, which are converted into
/// errors that `main` recognizes and prints to stdout.
pub fn next_as_command(usage: &str, p: &mut Parser) -> anyhow::Result<String> {
    let usage = usage.trim();
    let arg = match p.next()? {
        Some(arg) => arg,
        None => anyhow::bail!("{}", usage),
    };
    let cmd = match arg {
        Arg::Value(cmd) => cmd.string()?,
        Arg::Short('h') | Arg::Long("help") => {
            return Err(Help(usage.to_string()).into());
        }
        Arg::Long("version") => return Err(Version.into()),
        arg => return Err(arg.unexpected().into()),
    };
    Ok(cmd)
}

/// Parses the next `p.value()` into `T`. Any error messages will include the
/// given flag name in them.
pub fn parse<T>(p: &mut Parser, flag_name: &'static str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display + Debug + Send + Sync + 'static,
{
    let osv = p.value().context(flag_name)?;
    let Some(strv) = osv.to_str() else {
        let err = lexopt::Error::NonUnicodeValue(osv.into());
        return Err(anyhow::Error::from(err).context(flag_name));
    };
    strv.parse().map_err(|err| anyhow::Error::msg(err).context(flag_name))
}

/// The documentation of a single flag or positional argument.
///
/// `Usage::short` renders a list of these as a two column table while
/// `Usage::long` renders every paragraph, wrapped and indented.
#[derive(Clone, Copy, Debug)]
pub struct Usage {
    /// Whether this is docs for a flag (optional) or an argument (required).
    pub flag: bool,
    /// The format of the flag, for example, `-n/--now <date>`.
    pub format: &'static str,
    /// A one line description.
    pub short: &'static str,
    /// A description that may span multiple paragraphs.
    pub long: &'static str,
}

impl Usage {
    pub const fn flag(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { flag: true, format, short, long }
    }

    pub const fn arg(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { flag: false, format, short, long }
    }

    pub fn short(usages: &[Usage]) -> String {
        const MIN_SPACE: usize = 2;

        let mut result = String::new();
        let Some(max_len) = usages.iter().map(|u| u.format.len()).max() else {
            return result;
        };
        for usage in usages.iter() {
            let padding = " ".repeat(MIN_SPACE + max_len - usage.format.len());
            writeln!(result, "    {}{}{}", usage.format, padding, usage.short)
                .unwrap();
        }
        result
    }

    pub fn long(usages: &[Usage]) -> String {
        let wrap_opts = textwrap::Options::new(79)
            .initial_indent("        ")
            .subsequent_indent("        ");
        let mut result = String::new();
        for (i, usage) in usages.iter().enumerate() {
            if i > 0 {
                result.push('\n');
            }
            writeln!(result, "    {}", usage.format).unwrap();
            for (i, paragraph) in usage.long.trim().split("\n\n").enumerate() {
                if i > 0 {
                    result.push('\n');
                }
                let flattened = paragraph.replace('\n', " ");
                for line in textwrap::wrap(&flattened, &wrap_opts) {
                    result.push_str(&line);
                    result.push('\n');
                }
            }
        }
        result
    }
}

/// An error type indicating that the error is a `-h/--help` message.
///
/// `main` sniffs this out via downcasting and prints it to stdout with a
/// success exit code.
#[derive(Debug)]
pub struct Help(String);

impl Help {
    const USAGE: Usage = Usage::flag(
        "-h/--help",
        "Print help. Use `--help` for the long form.",
        r#"
Print help.

The short flag, -h, shows a condensed help output with a single line for every
flag. The long flag, --help, shows complete documentation.
"#,
    );
}

impl std::fmt::Display for Help {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Help {}

/// An error type indicating that the error is a `--version` message.
#[derive(Debug)]
pub struct Version;

impl Version {
    const USAGE: Usage = Usage::flag(
        "--version",
        "Print the version of taskdue.",
        "Print the version of taskdue.",
    );
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let semver = option_env!("CARGO_PKG_VERSION").unwrap_or("N/A");
        match option_env!("TASKDUE_BUILD_GIT_HASH") {
            None => write!(f, "taskdue {semver}"),
            Some(hash) => write!(f, "taskdue {semver} (rev {hash})"),
        }
    }
}

impl std::error::Error for Version {}
