use chrono::Local;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use std::convert::TryFrom;

use crate::data::{with_transaction, DBConnection};
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::*;

#[get("/goal")]
pub fn get_goal(db_connection: &State<DBConnection>) -> InternalResult<Json<GoalResponse>> {
    let db_connection = db_connection.lock()?;

    let goal = match get_goal_from_db(&db_connection)? {
        Some(goal) => GoalResponse::Goal(goal_view(goal, Local::now().date_naive())),
        None => GoalResponse::Empty {},
    };

    Ok(Json(goal))
}

#[post("/goal", format = "json", data = "<upsert_goal_request>")]
pub fn upsert_goal(
    upsert_goal_request: Json<UpsertGoalRequest>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<GoalView>> {
    let input = GoalInput::try_from(upsert_goal_request.into_inner())?;

    let goal = with_transaction(db_connection, |db| upsert_goal_in_db(input, db))?;
    tracing::info!(goal_id = goal.id, title = %goal.title, "goal saved");

    Ok(Json(goal_view(goal, Local::now().date_naive())))
}
