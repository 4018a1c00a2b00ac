use jiff::civil::{self, Weekday};

use crate::args::Usage;

/// The smallest interval permitted by a `d <n>` rule.
const MIN_INTERVAL_DAYS: i64 = 1;
/// The largest interval permitted by a `d <n>` rule.
const MAX_INTERVAL_DAYS: i64 = 400;

/// A parsed task repeat rule.
///
/// Rules are written in a tiny grammar where a single letter selects the kind
/// of rule and the payload (if any) follows after a single space:
///
/// * The empty string means the task doesn't repeat.
/// * `d <n>` repeats every `n` days, where `1 <= n <= 400`.
/// * `y` repeats every year on the same month and day.
/// * `w <weekday-list>` repeats on the given weekdays, where `1` is Monday
///   and `7` is Sunday.
/// * `m <day-list>[ <month-list>]` repeats on the given days of the month,
///   optionally only in the given months. Days are `1` through `31`, or `-1`
///   for the last day of the month and `-2` for the day before that. Months
///   are `1` through `12`.
///
/// Lists are comma separated. Parsing is all or nothing: if any part of a
/// rule is malformed, the entire rule is rejected.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum RecurrenceRule {
    /// The task is one-shot.
    #[default]
    None,
    /// Every `n` calendar days.
    EveryNDays(u16),
    /// Every calendar year.
    Yearly,
    /// On each of the given weekdays.
    Weekly(WeekdaySet),
    /// On each of the given days of the month. When `months` is empty, every
    /// month is eligible.
    Monthly { days: DaySet, months: MonthSet },
}

impl RecurrenceRule {
    pub const ARG: Usage = Usage::arg(
        "<repeat>",
        "A repeat rule, e.g., `d 7`, `y`, `w 1,5` or `m 1,-1`.",
        r#"
A repeat rule.

A rule is one of the following:

`d <n>` repeats every `n` days. `n` must be in the range 1 to 400.

`y` repeats every year on the same month and day. When a task falls on
February 29, it repeats on February 28 in years that aren't leap years.

`w <weekdays>` repeats on each of the given days of the week. Days are numbered
1 (Monday) through 7 (Sunday). For example, `w 1,3,5` repeats every Monday,
Wednesday and Friday.

`m <days> [<months>]` repeats on each of the given days of the month. Days are
numbered 1 through 31, with -1 meaning the last day of the month and -2 the day
before the last. Days that don't exist in a particular month are skipped. An
optional list of months, numbered 1 through 12, restricts the rule to those
months. For example, `m 1,15 3,6,9,12` repeats on the 1st and 15th of March,
June, September and December.

The empty string is a valid rule that means the task doesn't repeat. Asking
for the next date of such a task is an error.
"#,
    );
}

/// Returns true if and only if the given text is a valid repeat rule.
///
/// The empty string is valid. This agrees with `parse` by construction.
pub fn validate(rule: &str) -> bool {
    parse(rule).is_ok()
}

/// Parse the given text as a repeat rule.
pub fn parse(rule: &str) -> Result<RecurrenceRule, ParseError> {
    rule.parse()
}

impl std::str::FromStr for RecurrenceRule {
    type Err = ParseError;

    fn from_str(rule: &str) -> Result<RecurrenceRule, ParseError> {
        if rule.is_empty() {
            return Ok(RecurrenceRule::None);
        }
        let p = RuleParser { rule };
        let (kind, payload) = match rule.split_once(' ') {
            None => (rule, None),
            Some((kind, payload)) => (kind, Some(payload)),
        };
        match kind {
            "y" => match payload {
                None => Ok(RecurrenceRule::Yearly),
                Some(rest) => Err(p.trailing(rest)),
            },
            "d" => {
                let payload = p.required(payload, "day interval")?;
                let n = p.integer(
                    payload,
                    "day interval",
                    MIN_INTERVAL_DAYS..=MAX_INTERVAL_DAYS,
                )?;
                // Range checked above, so this always fits.
                Ok(RecurrenceRule::EveryNDays(n as u16))
            }
            "w" => {
                let payload = p.required(payload, "weekday list")?;
                let mut set = WeekdaySet::empty();
                for item in payload.split(',') {
                    let n = p.integer(item, "weekday", 1..=7)?;
                    set.insert(n as i8);
                }
                Ok(RecurrenceRule::Weekly(set))
            }
            "m" => {
                let payload = p.required(payload, "day of month list")?;
                let (days_list, months_list) = match payload.split_once(' ') {
                    None => (payload, None),
                    Some((days, months)) => (days, Some(months)),
                };
                let mut days = DaySet::empty();
                for item in days_list.split(',') {
                    let n = p.integer(item, "day of month", -2..=31)?;
                    let selector = DaySelector::new(n as i8)
                        .ok_or_else(|| p.zero_day())?;
                    days.insert(selector);
                }
                let mut months = MonthSet::empty();
                if let Some(months_list) = months_list {
                    if let Some((_, rest)) = months_list.split_once(' ') {
                        return Err(p.trailing(rest));
                    }
                    for item in months_list.split(',') {
                        let n = p.integer(item, "month", 1..=12)?;
                        months.insert(n as i8);
                    }
                }
                Ok(RecurrenceRule::Monthly { days, months })
            }
            _ => Err(ParseError::UnknownKind { rule: rule.to_string() }),
        }
    }
}

/// Writes the rule in its canonical form.
///
/// The canonical form always parses back to an equal rule. Lists are sorted
/// and free of duplicates. Days of the month are in calendar order, with `-2`
/// and `-1` at the end.
impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            RecurrenceRule::None => Ok(()),
            RecurrenceRule::EveryNDays(n) => write!(f, "d {n}"),
            RecurrenceRule::Yearly => write!(f, "y"),
            RecurrenceRule::Weekly(ref set) => {
                write!(f, "w ")?;
                write_list(f, set.iter())
            }
            RecurrenceRule::Monthly { ref days, ref months } => {
                write!(f, "m ")?;
                write_list(f, days.iter().map(DaySelector::get))?;
                if !months.is_empty() {
                    write!(f, " ")?;
                    write_list(f, months.iter())?;
                }
                Ok(())
            }
        }
    }
}

fn write_list(
    f: &mut std::fmt::Formatter,
    items: impl Iterator<Item = i8>,
) -> std::fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// A helper for building parse errors that mention the full rule.
struct RuleParser<'a> {
    rule: &'a str,
}

impl<'a> RuleParser<'a> {
    fn required(
        &self,
        payload: Option<&'a str>,
        what: &'static str,
    ) -> Result<&'a str, ParseError> {
        payload.ok_or_else(|| ParseError::Missing {
            rule: self.rule.to_string(),
            what,
        })
    }

    fn integer(
        &self,
        value: &str,
        what: &'static str,
        range: std::ops::RangeInclusive<i64>,
    ) -> Result<i64, ParseError> {
        let n = value.parse::<i64>().map_err(|_| ParseError::NotInteger {
            rule: self.rule.to_string(),
            what,
            value: value.to_string(),
        })?;
        if !range.contains(&n) {
            return Err(ParseError::OutOfRange {
                rule: self.rule.to_string(),
                what,
                value: n,
                min: *range.start(),
                max: *range.end(),
            });
        }
        Ok(n)
    }

    fn trailing(&self, rest: &str) -> ParseError {
        ParseError::Trailing {
            rule: self.rule.to_string(),
            rest: rest.to_string(),
        }
    }

    fn zero_day(&self) -> ParseError {
        ParseError::ZeroDay { rule: self.rule.to_string() }
    }
}

/// An error that occurs when a repeat rule is malformed.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(
        "unrecognized repeat rule `{rule}`: \
         expected it to start with `d`, `y`, `w` or `m`"
    )]
    UnknownKind { rule: String },
    #[error("repeat rule `{rule}` is missing its {what}")]
    Missing { rule: String, what: &'static str },
    #[error(
        "invalid {what} `{value}` in repeat rule `{rule}`: \
         not an integer"
    )]
    NotInteger { rule: String, what: &'static str, value: String },
    #[error(
        "invalid {what} `{value}` in repeat rule `{rule}`: \
         must be in the range {min}..={max}"
    )]
    OutOfRange {
        rule: String,
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("invalid day of month `0` in repeat rule `{rule}`")]
    ZeroDay { rule: String },
    #[error("repeat rule `{rule}` has unexpected trailing data `{rest}`")]
    Trailing { rule: String, rest: String },
}

/// A set of weekdays, numbered `1` (Monday) through `7` (Sunday).
///
/// The rule parser never produces an empty set, but nothing else relies on
/// that: a weekly search over an empty set fails after a week.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn empty() -> WeekdaySet {
        WeekdaySet(0)
    }

    /// Callers must ensure `1 <= number <= 7`.
    fn insert(&mut self, number: i8) {
        debug_assert!((1..=7).contains(&number));
        self.0 |= 1 << number;
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.to_monday_one_offset()) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i8> + '_ {
        (1..=7).filter(|&n| self.0 & (1 << n) != 0)
    }
}

/// A set of months, numbered `1` through `12`.
///
/// An empty set is used by monthly rules to mean "every month."
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MonthSet(u16);

impl MonthSet {
    fn empty() -> MonthSet {
        MonthSet(0)
    }

    /// Callers must ensure `1 <= month <= 12`.
    fn insert(&mut self, month: i8) {
        debug_assert!((1..=12).contains(&month));
        self.0 |= 1 << month;
    }

    pub fn contains(&self, month: i8) -> bool {
        (1..=12).contains(&month) && self.0 & (1 << month) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i8> + '_ {
        (1..=12).filter(|&n| self.0 & (1 << n) != 0)
    }
}

/// A single day-of-month position in a monthly rule.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DaySelector {
    /// The given day of the month, `1` through `31`.
    Day(i8),
    /// The day before the last day of the month, written `-2`.
    SecondToLast,
    /// The last day of the month, written `-1`.
    Last,
}

impl DaySelector {
    /// Returns the selector for the given rule value, or `None` if it isn't
    /// one of `1..=31`, `-1` or `-2`.
    pub fn new(value: i8) -> Option<DaySelector> {
        match value {
            -2 => Some(DaySelector::SecondToLast),
            -1 => Some(DaySelector::Last),
            1..=31 => Some(DaySelector::Day(value)),
            _ => None,
        }
    }

    /// Returns the value of this selector as written in a rule.
    pub fn get(self) -> i8 {
        match self {
            DaySelector::Day(day) => day,
            DaySelector::SecondToLast => -2,
            DaySelector::Last => -1,
        }
    }

    /// Resolves this selector to a concrete date in the month containing the
    /// given date.
    ///
    /// This returns `None` when the month has no such day, e.g., the 31st of
    /// April.
    pub fn resolve(self, in_month: civil::Date) -> Option<civil::Date> {
        let len = in_month.days_in_month();
        let day = match self {
            DaySelector::Day(day) if day <= len => day,
            DaySelector::Day(_) => return None,
            DaySelector::Last => len,
            DaySelector::SecondToLast if len > 1 => len - 1,
            DaySelector::SecondToLast => return None,
        };
        civil::Date::new(in_month.year(), in_month.month(), day).ok()
    }

    /// The bit this selector occupies in a `DaySet`. Days use bits 1-31,
    /// `-2` uses bit 32 and `-1` uses bit 33. This gives calendar order.
    fn bit(self) -> u32 {
        match self {
            DaySelector::Day(day) => day as u32,
            DaySelector::SecondToLast => 32,
            DaySelector::Last => 33,
        }
    }
}

/// A non-empty set of day-of-month selectors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DaySet(u64);

impl DaySet {
    fn empty() -> DaySet {
        DaySet(0)
    }

    fn insert(&mut self, selector: DaySelector) {
        self.0 |= 1 << selector.bit();
    }

    pub fn contains(&self, selector: DaySelector) -> bool {
        self.0 & (1 << selector.bit()) != 0
    }

    /// Yields each selector in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = DaySelector> + '_ {
        (1..=31)
            .filter_map(DaySelector::new)
            .chain([DaySelector::SecondToLast, DaySelector::Last])
            .filter(|&sel| self.contains(sel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(rule: &str) -> RecurrenceRule {
        parse(rule).unwrap()
    }

    fn err(rule: &str) -> String {
        parse(rule).unwrap_err().to_string()
    }

    #[test]
    fn empty_is_none() {
        assert_eq!(ok(""), RecurrenceRule::None);
        assert!(validate(""));
    }

    #[test]
    fn every_n_days() {
        assert_eq!(ok("d 1"), RecurrenceRule::EveryNDays(1));
        assert_eq!(ok("d 400"), RecurrenceRule::EveryNDays(400));
        assert_eq!(ok("d 07"), RecurrenceRule::EveryNDays(7));

        insta::assert_snapshot!(
            err("d 0"),
            @"invalid day interval `0` in repeat rule `d 0`: must be in the range 1..=400",
        );
        insta::assert_snapshot!(
            err("d 401"),
            @"invalid day interval `401` in repeat rule `d 401`: must be in the range 1..=400",
        );
        insta::assert_snapshot!(
            err("d"),
            @"repeat rule `d` is missing its day interval",
        );
        insta::assert_snapshot!(
            err("d x"),
            @"invalid day interval `x` in repeat rule `d x`: not an integer",
        );
        assert!(!validate("d "));
        assert!(!validate("d  5"));
        assert!(!validate("d 5 "));
        assert!(!validate("d 5 6"));
        assert!(!validate("d -5"));
        assert!(!validate("d 99999999999999999999"));
    }

    #[test]
    fn yearly() {
        assert_eq!(ok("y"), RecurrenceRule::Yearly);
        insta::assert_snapshot!(
            err("y 1"),
            @"repeat rule `y 1` has unexpected trailing data `1`",
        );
        assert!(!validate("y "));
        assert!(!validate("yearly"));
        assert!(!validate("Y"));
    }

    #[test]
    fn weekly() {
        let RecurrenceRule::Weekly(set) = ok("w 1,3") else {
            panic!("expected weekly rule")
        };
        assert!(set.contains(Weekday::Monday));
        assert!(set.contains(Weekday::Wednesday));
        assert!(!set.contains(Weekday::Tuesday));
        assert!(!set.contains(Weekday::Sunday));

        // Duplicates collapse.
        assert_eq!(ok("w 7,7,1"), ok("w 1,7"));

        insta::assert_snapshot!(
            err("w 0"),
            @"invalid weekday `0` in repeat rule `w 0`: must be in the range 1..=7",
        );
        insta::assert_snapshot!(
            err("w 1,8"),
            @"invalid weekday `8` in repeat rule `w 1,8`: must be in the range 1..=7",
        );
        insta::assert_snapshot!(
            err("w 1,,2"),
            @"invalid weekday `` in repeat rule `w 1,,2`: not an integer",
        );
        assert!(!validate("w"));
        assert!(!validate("w "));
        assert!(!validate("w 1,"));
        assert!(!validate("w mon"));
    }

    #[test]
    fn monthly() {
        let RecurrenceRule::Monthly { days, months } = ok("m 1,-1,-2,31")
        else {
            panic!("expected monthly rule")
        };
        assert!(days.contains(DaySelector::Day(1)));
        assert!(days.contains(DaySelector::Day(31)));
        assert!(days.contains(DaySelector::Last));
        assert!(days.contains(DaySelector::SecondToLast));
        assert!(!days.contains(DaySelector::Day(2)));
        assert!(months.is_empty());

        let RecurrenceRule::Monthly { months, .. } = ok("m 15 1,12") else {
            panic!("expected monthly rule")
        };
        assert!(months.contains(1));
        assert!(months.contains(12));
        assert!(!months.contains(6));

        insta::assert_snapshot!(
            err("m 0"),
            @"invalid day of month `0` in repeat rule `m 0`",
        );
        insta::assert_snapshot!(
            err("m -3"),
            @"invalid day of month `-3` in repeat rule `m -3`: must be in the range -2..=31",
        );
        insta::assert_snapshot!(
            err("m 32"),
            @"invalid day of month `32` in repeat rule `m 32`: must be in the range -2..=31",
        );
        insta::assert_snapshot!(
            err("m 1 13"),
            @"invalid month `13` in repeat rule `m 1 13`: must be in the range 1..=12",
        );
        insta::assert_snapshot!(
            err("m 1 1 1"),
            @"repeat rule `m 1 1 1` has unexpected trailing data `1`",
        );
        assert!(!validate("m"));
        assert!(!validate("m "));
        assert!(!validate("m 1 "));
        assert!(!validate("m 1 0"));
        assert!(!validate("m ,1"));
    }

    #[test]
    fn unknown_kind() {
        insta::assert_snapshot!(
            err("x 1"),
            @"unrecognized repeat rule `x 1`: expected it to start with `d`, `y`, `w` or `m`",
        );
        assert!(!validate(" "));
        assert!(!validate(" d 1"));
        assert!(!validate("d\t1"));
        assert!(!validate("dd 1"));
    }

    #[test]
    fn canonical_form() {
        let canonical = |rule: &str| ok(rule).to_string();
        assert_eq!(canonical(""), "");
        assert_eq!(canonical("d 007"), "d 7");
        assert_eq!(canonical("y"), "y");
        assert_eq!(canonical("w 7,3,3,1"), "w 1,3,7");
        assert_eq!(canonical("m -1,15,-2,1"), "m 1,15,-2,-1");
        assert_eq!(canonical("m 5 12,1,12"), "m 5 1,12");

        for rule in ["d 7", "y", "w 1,3,7", "m 1,15,-2,-1", "m 5 1,12", ""] {
            assert_eq!(
                ok(rule).to_string().parse::<RecurrenceRule>(),
                Ok(ok(rule)),
            );
        }
    }

    #[test]
    fn resolve_day_selectors() {
        let feb_leap = civil::date(2024, 2, 10);
        let feb = civil::date(2023, 2, 1);
        let apr = civil::date(2024, 4, 30);

        assert_eq!(
            DaySelector::Last.resolve(feb_leap),
            Some(civil::date(2024, 2, 29)),
        );
        assert_eq!(
            DaySelector::Last.resolve(feb),
            Some(civil::date(2023, 2, 28)),
        );
        assert_eq!(
            DaySelector::SecondToLast.resolve(feb),
            Some(civil::date(2023, 2, 27)),
        );
        assert_eq!(DaySelector::Day(29).resolve(feb), None);
        assert_eq!(
            DaySelector::Day(29).resolve(feb_leap),
            Some(civil::date(2024, 2, 29)),
        );
        assert_eq!(DaySelector::Day(31).resolve(apr), None);
        assert_eq!(
            DaySelector::Day(30).resolve(apr),
            Some(civil::date(2024, 4, 30)),
        );
    }
}
