use crate::{
    date::{Date, DateError},
    next,
    rule::{ParseError, RecurrenceRule},
};

/// A task as it is exchanged with a task store.
///
/// Every field is a string, exactly as stored. In particular, `date` is
/// `YYYYMMDD` (or empty when a task is being created) and `repeat` is the
/// unparsed repeat rule. Fields missing from the input are treated as empty.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize,
)]
#[serde(default)]
pub struct Task {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub date: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repeat: String,
}

/// What should happen to a task when it is marked as done.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Completion {
    /// The task doesn't repeat, so it should be removed.
    Delete,
    /// The task repeats, so it should be moved to this date.
    Reschedule(Date),
}

impl Completion {
    pub fn action(&self) -> &'static str {
        match *self {
            Completion::Delete => "delete",
            Completion::Reschedule(_) => "reschedule",
        }
    }

    pub fn date(&self) -> Option<Date> {
        match *self {
            Completion::Delete => None,
            Completion::Reschedule(date) => Some(date),
        }
    }
}

/// Decides what happens to the given task when it is marked done on `today`.
///
/// A task without a repeat rule is deleted. Otherwise, it is rescheduled to
/// its next date strictly after `today`.
pub fn complete(today: Date, task: &Task) -> Result<Completion, next::Error> {
    if task.repeat.is_empty() {
        return Ok(Completion::Delete);
    }
    next::next_date(today, &task.date, &task.repeat).map(Completion::Reschedule)
}

/// Prepares a new task to be written to a task store.
///
/// A task needs a title. Its repeat rule, when present, must be valid. An
/// empty date means `today`, and a date in the past is moved up to `today`.
/// Any other date must be a valid `YYYYMMDD` date. Nothing malformed is ever
/// corrected: the task is rejected instead.
pub fn normalize(today: Date, mut task: Task) -> Result<Task, TaskError> {
    if task.title.trim().is_empty() {
        return Err(TaskError::MissingTitle);
    }
    let date = if task.date.is_empty() {
        today
    } else {
        task.date.parse::<Date>().map_err(TaskError::InvalidDate)?
    };
    task.repeat
        .parse::<RecurrenceRule>()
        .map_err(TaskError::InvalidRule)?;
    task.date = date.max(today).to_string();
    Ok(task)
}

/// Checks an edited task before it replaces the stored one.
///
/// Unlike `normalize`, nothing is filled in or moved: the task must already
/// have an id, a `YYYYMMDD` date, a valid repeat rule (or none) and a title.
/// Checks run in that order and the first failure is reported.
pub fn validate_update(task: &Task) -> Result<(), TaskError> {
    if task.id.trim().is_empty() {
        return Err(TaskError::MissingId);
    }
    task.date.parse::<Date>().map_err(TaskError::InvalidDate)?;
    task.repeat.parse::<RecurrenceRule>().map_err(TaskError::InvalidRule)?;
    if task.title.trim().is_empty() {
        return Err(TaskError::MissingTitle);
    }
    Ok(())
}

/// An error that occurs when a task can't be written as given.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("task id is required")]
    MissingId,
    #[error("task title is required")]
    MissingTitle,
    #[error("incorrect task date: {0}")]
    InvalidDate(DateError),
    #[error("incorrect repeat rule: {0}")]
    InvalidRule(ParseError),
}
