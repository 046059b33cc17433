use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{Task, TaskStatus};

pub const TITLE_MAX_LENGTH: usize = 200;

const REQUIRED_MESSAGE: &str = "This field is required.";
const INVALID_DATE_TIME_MESSAGE: &str = "Enter a valid date/time.";
const DATE_TIME_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Formats accepted for a due date without an offset, tried in order.
const DATE_TIME_FORMATS: [&str; 5] = [
    DATE_TIME_INPUT_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Raw task fields as submitted by the browser.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TaskFormInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Task fields that passed validation and can be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTask {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
}

/// Validation messages keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Returns the messages recorded for `field`.
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

impl TaskFormInput {
    /// Validates every field, collecting all errors before giving up.
    ///
    /// A missing due date becomes `now` and a missing status becomes pending.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidTask, FieldErrors> {
        let mut errors = FieldErrors::default();

        let title = trimmed(&self.title);
        let title_length = title.chars().count();
        if title.is_empty() {
            errors.add("title", REQUIRED_MESSAGE);
        } else if title_length > TITLE_MAX_LENGTH {
            errors.add(
                "title",
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    TITLE_MAX_LENGTH, title_length
                ),
            );
        }

        let description = trimmed(&self.description).to_string();

        let due_date = match trimmed(&self.due_date) {
            "" => Some(now),
            raw => {
                let parsed = parse_due_date(raw);
                if parsed.is_none() {
                    errors.add("due_date", INVALID_DATE_TIME_MESSAGE);
                }
                parsed
            }
        };

        let status = match trimmed(&self.status) {
            "" => Some(TaskStatus::Pending),
            raw => {
                let parsed = TaskStatus::parse(raw);
                if parsed.is_none() {
                    errors.add(
                        "status",
                        format!(
                            "Select a valid choice. {} is not one of the available choices.",
                            raw
                        ),
                    );
                }
                parsed
            }
        };

        match (due_date, status) {
            (Some(due_date), Some(status)) if errors.is_empty() => Ok(ValidTask {
                title: title.to_string(),
                description,
                due_date,
                status,
            }),
            _ => Err(errors),
        }
    }
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

/// Parses a due date, reading values without an offset as UTC.
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Utc));
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Values and errors rendered by the task form template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFormView {
    pub action: String,
    pub editing: bool,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub status: String,
    pub title_errors: Vec<String>,
    pub description_errors: Vec<String>,
    pub due_date_errors: Vec<String>,
    pub status_errors: Vec<String>,
}

impl TaskFormView {
    /// An empty form for a new task, due now.
    pub fn for_create(now: DateTime<Utc>) -> Self {
        Self {
            action: "/create".to_string(),
            editing: false,
            title: String::new(),
            description: String::new(),
            due_date: now.format(DATE_TIME_INPUT_FORMAT).to_string(),
            status: TaskStatus::Pending.as_str().to_string(),
            title_errors: Vec::new(),
            description_errors: Vec::new(),
            due_date_errors: Vec::new(),
            status_errors: Vec::new(),
        }
    }

    /// A form pre-filled with an existing task.
    pub fn for_edit(task: &Task) -> Self {
        Self {
            action: format!("/update/{}", task.id()),
            editing: true,
            title: task.title().to_string(),
            description: task.description().to_string(),
            due_date: task.due_date().format(DATE_TIME_INPUT_FORMAT).to_string(),
            status: task.status().as_str().to_string(),
            title_errors: Vec::new(),
            description_errors: Vec::new(),
            due_date_errors: Vec::new(),
            status_errors: Vec::new(),
        }
    }

    /// Re-displays a rejected submission with its errors.
    pub fn rejected(action: String, input: &TaskFormInput, errors: &FieldErrors) -> Self {
        let raw = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            editing: action != "/create",
            action,
            title: raw(&input.title),
            description: raw(&input.description),
            due_date: raw(&input.due_date),
            status: raw(&input.status),
            title_errors: errors.messages("title").to_vec(),
            description_errors: errors.messages("description").to_vec(),
            due_date_errors: errors.messages("due_date").to_vec(),
            status_errors: errors.messages("status").to_vec(),
        }
    }

    /// Statuses offered by the status select.
    pub fn status_choices(&self) -> &'static [TaskStatus] {
        &TaskStatus::ALL
    }

    pub fn has_errors(&self) -> bool {
        !(self.title_errors.is_empty()
            && self.description_errors.is_empty()
            && self.due_date_errors.is_empty()
            && self.status_errors.is_empty())
    }
}
