use jiff::{Span, ToSpan, civil};

use crate::{
    date::{Date, DateError},
    rule::{DaySet, MonthSet, ParseError, RecurrenceRule, WeekdaySet},
};

/// The number of months, including the starting month, that a monthly rule
/// is searched before giving up.
///
/// The longest legitimate gap is a rule for February 29 spanning a century
/// year that isn't a leap year, e.g., from 2096 to 2104. That's 96 months.
pub const MONTHLY_SEARCH_LIMIT: usize = 120;

/// Computes the next date on which a task is due.
///
/// `anchor` is the task's date in `YYYYMMDD` form and `rule` is its repeat
/// rule. The date returned is always strictly after `now`.
///
/// The rule is validated before anything else, so this is safe to call with
/// arbitrary input.
pub fn next_date(now: Date, anchor: &str, rule: &str) -> Result<Date, Error> {
    let rule: RecurrenceRule = rule.parse().map_err(Error::InvalidRule)?;
    let anchor: Date = anchor.parse().map_err(Error::InvalidAnchorDate)?;
    rule.next_after(now, anchor)
}

impl RecurrenceRule {
    /// Returns the first date selected by this rule that is strictly after
    /// `now`, starting the search from `anchor`.
    ///
    /// For `d` and `y` rules, the result is always at least one interval
    /// after `anchor`, even when `anchor` is already after `now`. For `w` and
    /// `m` rules, the search begins at the later of `anchor` and `now`.
    pub fn next_after(&self, now: Date, anchor: Date) -> Result<Date, Error> {
        let (now, anchor) = (now.get(), anchor.get());
        let next = match *self {
            RecurrenceRule::None => return Err(Error::EmptyRule),
            RecurrenceRule::EveryNDays(n) => every_n_days(now, anchor, n)?,
            RecurrenceRule::Yearly => yearly(now, anchor)?,
            RecurrenceRule::Weekly(ref weekdays) => {
                weekly(now, anchor, weekdays)?
            }
            RecurrenceRule::Monthly { ref days, ref months } => {
                monthly(now, anchor, days, months)?
            }
        };
        debug_assert!(next > now, "{next} must be after {now}");
        Ok(Date::from(next))
    }
}

fn every_n_days(
    now: civil::Date,
    anchor: civil::Date,
    n: u16,
) -> Result<civil::Date, Error> {
    let n = i64::from(n);
    // The smallest number of steps `k >= 1` with `anchor + k*n > now`.
    let steps = if anchor > now {
        1
    } else {
        let elapsed = anchor.until(now).map_err(Error::out_of_range)?;
        i64::from(elapsed.get_days()) / n + 1
    };
    let span = Span::new().try_days(steps * n).map_err(Error::out_of_range)?;
    anchor.checked_add(span).map_err(Error::out_of_range)
}

fn yearly(now: civil::Date, anchor: civil::Date) -> Result<civil::Date, Error> {
    // Each candidate is computed from the anchor directly rather than by
    // repeatedly adding one year. Otherwise, a February 29 anchor would get
    // stuck on February 28 after the first non-leap year.
    let mut years = i64::from(now.year() - anchor.year()).max(1);
    loop {
        let span = Span::new().try_years(years).map_err(Error::out_of_range)?;
        let next = anchor.checked_add(span).map_err(Error::out_of_range)?;
        if next > now {
            return Ok(next);
        }
        years += 1;
    }
}

fn weekly(
    now: civil::Date,
    anchor: civil::Date,
    weekdays: &WeekdaySet,
) -> Result<civil::Date, Error> {
    let mut cursor = anchor.max(now);
    if cursor <= now {
        cursor = now.tomorrow().map_err(Error::out_of_range)?;
    }
    // Seven consecutive days cover every weekday, so only an empty set can
    // fall through.
    for _ in 0..7 {
        if weekdays.contains(cursor.weekday()) {
            return Ok(cursor);
        }
        cursor = cursor.tomorrow().map_err(Error::out_of_range)?;
    }
    Err(Error::NoOccurrenceFound { within: "7 days".to_string() })
}

fn monthly(
    now: civil::Date,
    anchor: civil::Date,
    days: &DaySet,
    months: &MonthSet,
) -> Result<civil::Date, Error> {
    let mut month = anchor.max(now).first_of_month();
    for _ in 0..MONTHLY_SEARCH_LIMIT {
        if months.is_empty() || months.contains(month.month()) {
            let earliest = days
                .iter()
                .filter_map(|selector| selector.resolve(month))
                .filter(|&date| date > now)
                .min();
            if let Some(date) = earliest {
                return Ok(date);
            }
        }
        month = month.checked_add(1.month()).map_err(Error::out_of_range)?;
    }
    Err(Error::NoOccurrenceFound {
        within: format!("{MONTHLY_SEARCH_LIMIT} months"),
    })
}

/// An error that occurs when computing the next date of a task.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The task has no repeat rule, and so no next date.
    #[error("repeat rule is empty")]
    EmptyRule,
    /// The repeat rule is malformed.
    #[error("incorrect repeat rule: {0}")]
    InvalidRule(ParseError),
    /// The task's date isn't a valid `YYYYMMDD` date.
    #[error("incorrect task date: {0}")]
    InvalidAnchorDate(DateError),
    /// A monthly rule didn't select any date within the search limit. This
    /// happens for rules like `m 31 2,4`. A weekly rule with no weekdays
    /// fails the same way after a week.
    #[error("no date matches the repeat rule within {within}")]
    NoOccurrenceFound { within: String },
    /// The next date would be outside the supported range of dates.
    #[error("next date is out of range: {0}")]
    OutOfRange(String),
}

impl Error {
    fn out_of_range(err: jiff::Error) -> Error {
        Error::OutOfRange(err.to_string())
    }
}
