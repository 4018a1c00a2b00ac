use jiff::{Timestamp, Zoned, civil};

use crate::{TODAY, TZ, args::Usage};

/// A calendar date in its canonical external form, `YYYYMMDD`.
///
/// This is the only date representation tasks carry. Parsing is strict: the
/// input must be exactly eight ASCII digits naming a real calendar date. There
/// are no separators, no partial dates and no surrounding whitespace.
///
/// There is no time of day and no time zone. Two `Date` values compare by
/// calendar day only.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Date(civil::Date);

impl Date {
    pub const ARG: Usage = Usage::arg(
        "<date>",
        "The task's date in `YYYYMMDD` form, e.g., `20240115`.",
        r#"
The task's date in `YYYYMMDD` form, e.g., `20240115`.

This is the anchor from which recurrence starts. It is usually the date the
task was originally scheduled for, or the date it was last completed.

Only the strict eight digit form is accepted. Separators (like in
`2024-01-15`) and partial dates are rejected.
"#,
    );

    /// Returns the underlying civil date.
    pub fn get(self) -> civil::Date {
        self.0
    }
}

impl From<civil::Date> for Date {
    fn from(date: civil::Date) -> Date {
        Date(date)
    }
}

impl From<Date> for civil::Date {
    fn from(date: Date) -> civil::Date {
        date.0
    }
}

impl std::str::FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Date, DateError> {
        let bytes = s.as_bytes();
        if bytes.len() != 8 || !bytes.iter().all(|b| b.is_ascii_digit()) {
            return Err(DateError::Syntax(s.to_string()));
        }
        let field = |range: std::ops::Range<usize>| {
            s[range].parse::<i16>().map_err(|_| DateError::Syntax(s.into()))
        };
        let (year, month, day) = (field(0..4)?, field(4..6)?, field(6..8)?);
        // Month and day are two digits, so they always fit in an `i8`.
        civil::Date::new(year, month as i8, day as i8).map(Date).map_err(
            |err| DateError::Calendar {
                input: s.to_string(),
                reason: err.to_string(),
            },
        )
    }
}

impl std::fmt::Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // N.B. Every parser rejects years outside 0000-9999 and the
        // calculator only moves forward, so `YYYYMMDD` always fits.
        write!(
            f,
            "{:04}{:02}{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl serde::Serialize for Date {
    fn serialize<S: serde::Serializer>(
        &self,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// An error that occurs when a `YYYYMMDD` string can't be parsed.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DateError {
    /// The input isn't exactly eight ASCII digits.
    #[error("invalid date `{0}`: expected exactly eight digits in YYYYMMDD form")]
    Syntax(String),
    /// The input has the right shape but names a day that doesn't exist,
    /// e.g., `20230229`.
    #[error("invalid date `{input}`: {reason}")]
    Calendar { input: String, reason: String },
}

/// A date given on the command line.
///
/// This accepts the strict `YYYYMMDD` form and a few conveniences that only
/// make sense for a human typing at a shell: `today`, `tomorrow`, `yesterday`
/// and full timestamps. Timestamps are truncated to the calendar day they
/// fall on in the local time zone.
///
/// This is never used for dates read from task data. Those go through `Date`.
#[derive(Clone, Copy, Debug)]
pub struct DateFlexible(Date);

impl DateFlexible {
    pub const NOW_FLAG: Usage = Usage::flag(
        "-n/--now <date>",
        "The reference date, e.g., `20240115` or `tomorrow`.",
        r#"
The reference date. Computed dates are always strictly after this date.

When absent, the `TASKDUE_NOW` environment variable is consulted, and if that
isn't set, the current date in the local time zone is used. The local time
zone may be overridden by setting the `TZ` environment variable.

Accepted formats are `YYYYMMDD` (e.g., `20240115`), the special strings
`today`, `tomorrow` and `yesterday`, and RFC 3339 or RFC 9557 timestamps (e.g.,
`2024-01-15T17:30:00-05:00`). A timestamp's time of day is discarded: only the
local calendar date it falls on is used.
"#,
    );

    pub fn get(self) -> Date {
        self.0
    }
}

impl From<DateFlexible> for Date {
    fn from(date: DateFlexible) -> Date {
        date.0
    }
}

impl std::str::FromStr for DateFlexible {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<DateFlexible> {
        let today = *TODAY;
        let date = match s {
            "today" => today,
            "tomorrow" => today.tomorrow()?,
            "yesterday" => today.yesterday()?,
            _ => return parse_date_or_timestamp(s).map(DateFlexible),
        };
        representable(s, date).map(DateFlexible)
    }
}

/// Parses a strict `YYYYMMDD` date or a timestamp truncated to its local
/// calendar date.
///
/// This is also used for reading the `TASKDUE_NOW` environment variable.
pub fn parse_date_or_timestamp(s: &str) -> anyhow::Result<Date> {
    let strict_err = match s.parse::<Date>() {
        Ok(date) => return Ok(date),
        Err(err) => err,
    };
    // An RFC 9557 string carries its own time zone annotation. We still
    // convert to local time, since that's what "today" means everywhere
    // else.
    if let Ok(zdt) = s.parse::<Zoned>() {
        return representable(s, truncate(&zdt.with_time_zone(TZ.clone())));
    }
    if let Ok(ts) = s.parse::<Timestamp>() {
        return representable(s, truncate(&ts.to_zoned(TZ.clone())));
    }
    Err(anyhow::Error::from(strict_err)
        .context(format!("`{s}` is not a YYYYMMDD date or a timestamp")))
}

/// Accepts a date only when it can be written as `YYYYMMDD`.
///
/// Timestamps may carry signed six digit years, e.g., `-000005-03-01T12:00Z`.
fn representable(s: &str, date: civil::Date) -> anyhow::Result<Date> {
    anyhow::ensure!(
        (0..=9999).contains(&date.year()),
        "`{s}` falls on {date}, but only years 0000 through 9999 are supported",
    );
    Ok(Date(date))
}

/// Truncates a zoned datetime to its calendar day.
pub fn truncate(zdt: &Zoned) -> civil::Date {
    zdt.date()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[test]
    fn parse_strict() {
        assert_eq!(date("20240115").get(), civil::date(2024, 1, 15));
        assert_eq!(date("00010101").get(), civil::date(1, 1, 1));
        assert_eq!(date("20240229").get(), civil::date(2024, 2, 29));
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        for input in [
            "",
            "2024011",
            "202401150",
            "2024-01-15",
            " 20240115",
            "20240115 ",
            "+2024011",
            "2024O115",
            "２０２４０１１５",
        ] {
            assert_eq!(
                input.parse::<Date>(),
                Err(DateError::Syntax(input.to_string())),
                "input: {input:?}",
            );
        }
    }

    #[test]
    fn parse_rejects_non_existent_days() {
        for input in ["20230229", "20240132", "20241301", "20240100", "20240001"]
        {
            let err = input.parse::<Date>().unwrap_err();
            assert!(
                matches!(err, DateError::Calendar { .. }),
                "input: {input:?}, error: {err:?}",
            );
        }
    }

    #[test]
    fn display_pads() {
        assert_eq!(date("20240105").to_string(), "20240105");
        assert_eq!(Date::from(civil::date(987, 3, 4)).to_string(), "09870304");
    }

    #[test]
    fn serialize_as_string() {
        let json = serde_json::to_string(&date("20240229")).unwrap();
        assert_eq!(json, r#""20240229""#);
    }

    #[test]
    fn timestamp_outside_yyyymmdd_years() {
        let err = parse_date_or_timestamp("-000005-03-01T12:00:00Z")
            .unwrap_err()
            .to_string();
        assert!(
            err.contains("only years 0000 through 9999 are supported"),
            "{err}",
        );
        let err = parse_date_or_timestamp(
            "-000005-03-01T12:00:00+00:00[UTC]",
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("only years 0000 through 9999"), "{err}");

        // Year zero is still eight digits.
        let got = parse_date_or_timestamp("0000-06-15T12:00:00Z").unwrap();
        assert_eq!((got.get().year(), got.get().month()), (0, 6));
        assert_eq!(&got.to_string()[..6], "000006");
    }

    #[test]
    fn truncate_discards_time() {
        let zdt: Zoned = "2024-03-10T23:59:59-04:00[America/New_York]"
            .parse()
            .unwrap();
        assert_eq!(truncate(&zdt), civil::date(2024, 3, 10));
        let midnight = zdt.start_of_day().unwrap();
        assert_eq!(truncate(&midnight), truncate(&zdt));
    }
}
