use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use std::convert::TryFrom;

use crate::data::parse_iso_date;
use crate::internal_error::InternalError;

pub type GoalID = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: GoalID,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A goal as served to clients, with its derived calendar progress.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GoalView {
    pub id: GoalID,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timeline_progress: i64,
}

/// Serializes to the goal view, or to `{}` when no goal has been set.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum GoalResponse {
    Goal(GoalView),
    Empty {},
}

#[derive(Deserialize, Debug)]
pub struct UpsertGoalRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalInput {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TryFrom<UpsertGoalRequest> for GoalInput {
    type Error = InternalError;

    fn try_from(request: UpsertGoalRequest) -> Result<GoalInput, InternalError> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(InternalError::validation("Goal title must not be empty"));
        }

        Ok(GoalInput {
            title,
            description: request.description.unwrap_or_default().trim().to_string(),
            start_date: parse_iso_date("start_date", &request.start_date)?,
            end_date: parse_iso_date("end_date", &request.end_date)?,
        })
    }
}
