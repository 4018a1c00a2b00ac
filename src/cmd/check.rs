use std::io::Write;

use lexopt::{Arg, Parser};

use crate::{
    args::{self, Configurable, Usage, positional::Arguments},
    rule,
};

const USAGE: &'static str = r#"
Validate repeat rules.

Each valid rule is printed in its canonical form, one per line. For example,
`w 7,1` is printed as `w 1,7`. The empty rule, meaning a task that doesn't
repeat, is valid and printed as an empty line.

Checking stops at the first invalid rule, which is reported as an error.

With `-q/--quiet`, nothing is printed. Instead, the exit code indicates whether
every rule is valid.

Rules may be given as positional arguments. When there are no positional
arguments, rules are read from stdin, one per line.

USAGE:
    taskdue check <repeat>...
    taskdue check < line delimited repeat rules

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Check a weekly rule:

        $ taskdue check 'w 5,1,3'
        w 1,3,5

    %snip-start%

    Check every rule in a file:

        $ taskdue check < rules
        d 7
        m 1,-1 1,12
        y

    Every item in a list must be in range:

        $ taskdue check 'w 1,8'
        invalid weekday `8` in repeat rule `w 1,8`: must be in the range 1..=7

    Use the exit code in a shell script:

        $ taskdue check -q "$rule" || echo "bad rule: $rule"

    %snip-end%
REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

const RULES_ARG: Usage = Usage::arg(
    "<repeat>...",
    "Repeat rules to check, e.g., `d 7` or `m 1,-1`.",
    r#"
One or more repeat rules to check. When absent, rules are read from stdin, one
per line.

Each rule has one of the forms `d <n>`, `y`, `w <weekdays>` or
`m <days> [<months>]`. See `taskdue next --help` for a full description.
"#,
);

pub fn run(p: &mut Parser) -> anyhow::Result<()> {
    let mut config = Config::default();
    let mut rules = Arguments::new(RULES_ARG);
    args::configure(p, USAGE, &mut [&mut config, &mut rules])?;

    if config.quiet {
        let mut all_valid = true;
        rules.try_map(|text| {
            all_valid = rule::validate(text);
            log::debug!("rule `{text}` is valid? {all_valid}");
            Ok(all_valid)
        })?;
        anyhow::ensure!(all_valid, crate::cmd::Silent);
        return Ok(());
    }

    let mut wtr = std::io::stdout().lock();
    rules.try_map(|text| {
        let parsed = rule::parse(text)?;
        log::debug!("rule `{text}` is valid: {parsed:?}");
        writeln!(wtr, "{parsed}")?;
        Ok(true)
    })
}

#[derive(Debug, Default)]
struct Config {
    quiet: bool,
}

impl Configurable for Config {
    fn configure(
        &mut self,
        _: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            Arg::Short('q') | Arg::Long("quiet") => {
                self.quiet = true;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const QUIET: Usage = Usage::flag(
            "-q/--quiet",
            "Print nothing. Exit with 1 if any rule is invalid.",
            r#"
Print nothing. Instead, exit with 0 if every rule is valid and 1 otherwise.
Checking still stops at the first invalid rule.
"#,
        );
        &[QUIET]
    }
}
