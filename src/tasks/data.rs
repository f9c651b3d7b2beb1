use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize};

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use crate::data::parse_iso_date;
use crate::internal_error::InternalError;

pub type TaskID = i64;

pub const DEFAULT_CATEGORY: &str = "personal";
pub const MAX_PROGRESS: i64 = 100;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Once,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Once => "once",
        }
    }
}

impl Default for Frequency {
    fn default() -> Frequency {
        Frequency::Daily
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Frequency, InternalError> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "once" => Ok(Frequency::Once),
            _ => Err(InternalError::validation("Invalid frequency")),
        }
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Frequency> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskID,
    pub title: String,
    pub category: String,
    pub frequency: Frequency,
    pub due_date: Option<NaiveDate>,
    pub progress: i64,
    pub completed: bool,
    pub notes: String,
    pub sort_order: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    pub category: Option<String>,
    pub frequency: Option<String>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
}

/// A validated task ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub category: String,
    pub frequency: Frequency,
    pub due_date: Option<NaiveDate>,
    pub notes: String,
}

impl NewTask {
    pub fn new(title: &str, frequency: Frequency, category: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            category: category.to_string(),
            frequency,
            due_date: None,
            notes: String::new(),
        }
    }
}

impl TryFrom<CreateTaskRequest> for NewTask {
    type Error = InternalError;

    fn try_from(request: CreateTaskRequest) -> Result<NewTask, InternalError> {
        let frequency = match request.frequency.as_deref() {
            Some(frequency) => frequency.parse()?,
            None => Frequency::default(),
        };

        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(InternalError::validation("Task title must not be empty"));
        }

        let category = match request.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category.to_string(),
            _ => DEFAULT_CATEGORY.to_string(),
        };

        let due_date = match request.due_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => Some(parse_iso_date("due_date", date)?),
            _ => None,
        };

        Ok(NewTask {
            title,
            category,
            frequency,
            due_date,
            notes: request.notes.unwrap_or_default().trim().to_string(),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub due_date: Option<Option<String>>,
    pub progress: Option<i64>,
    pub completed: Option<bool>,
}

// Distinguishes an absent field (None) from an explicit null (Some(None)).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The typed set of fields a partial update touches.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub frequency: Option<Frequency>,
    pub due_date: Option<Option<NaiveDate>>,
    pub progress: Option<i64>,
    pub completed: Option<bool>,
}

impl TryFrom<UpdateTaskRequest> for TaskChanges {
    type Error = InternalError;

    fn try_from(request: UpdateTaskRequest) -> Result<TaskChanges, InternalError> {
        let title = match request.title {
            Some(title) => {
                let title = title.trim().to_string();
                if title.is_empty() {
                    return Err(InternalError::validation("Task title must not be empty"));
                }
                Some(title)
            }
            None => None,
        };

        // Updates merge leniently: an unknown frequency keeps the stored one.
        let frequency = request.frequency.and_then(|frequency| {
            match frequency.parse::<Frequency>() {
                Ok(frequency) => Some(frequency),
                Err(_) => {
                    tracing::warn!(%frequency, "ignoring invalid frequency in task update");
                    None
                }
            }
        });

        let due_date = match request.due_date {
            Some(Some(date)) if !date.trim().is_empty() => {
                Some(Some(parse_iso_date("due_date", &date)?))
            }
            Some(_) => Some(None),
            None => None,
        };

        Ok(TaskChanges {
            title,
            category: request.category.map(|s| s.trim().to_string()),
            notes: request.notes.map(|s| s.trim().to_string()),
            frequency,
            due_date,
            progress: request.progress,
            completed: request.completed,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct ReorderRequest {
    #[serde(default)]
    pub ordered_ids: Vec<TaskID>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct LogRequest {
    pub done_on: Option<String>,
}

impl LogRequest {
    /// Parses an optional JSON body. Only an empty body means "no request";
    /// anything else must be a well-formed `LogRequest`.
    pub fn from_body(body: &str) -> Result<LogRequest, InternalError> {
        if body.trim().is_empty() {
            return Ok(LogRequest::default());
        }

        serde_json::from_str(body)
            .map_err(|e| InternalError::validation(format!("Invalid log request: {}", e)))
    }
}

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TaskLog {
    pub id: i64,
    pub task_id: TaskID,
    pub done_on: NaiveDate,
    pub note: String,
}
