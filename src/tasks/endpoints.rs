use chrono::Local;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, State};

use std::convert::TryFrom;

use crate::data::{parse_iso_date, with_transaction, DBConnection};
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::*;

#[get("/tasks")]
pub fn get_tasks(db_connection: &State<DBConnection>) -> InternalResult<Json<Vec<Task>>> {
    let db_connection = db_connection.lock()?;

    let tasks = get_all_tasks_from_db(&db_connection)?;

    Ok(Json(tasks))
}

#[post("/tasks", format = "json", data = "<create_task_request>")]
pub fn create_task(
    create_task_request: Json<CreateTaskRequest>,
    db_connection: &State<DBConnection>,
) -> InternalResult<(Status, Json<Task>)> {
    let new_task = NewTask::try_from(create_task_request.into_inner())?;

    let task = with_transaction(db_connection, |db| add_task_to_db(new_task, db))?;
    tracing::info!(task_id = task.id, title = %task.title, "task created");

    Ok((Status::Created, Json(task)))
}

#[post("/tasks/reorder", format = "json", data = "<reorder_request>")]
pub fn reorder_tasks(
    reorder_request: Json<ReorderRequest>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<StatusResponse>> {
    let reorder_request = reorder_request.into_inner();

    let touched = with_transaction(db_connection, |db| {
        reorder_tasks_in_db(&reorder_request.ordered_ids, reorder_request.completed, db)
    })?;
    tracing::debug!(touched, completed = reorder_request.completed, "tasks reordered");

    Ok(Json(StatusResponse { status: "ok" }))
}

#[patch("/tasks/<task_id>", format = "json", data = "<update_task_request>")]
pub fn update_task(
    task_id: TaskID,
    update_task_request: Json<UpdateTaskRequest>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<Task>> {
    let changes = TaskChanges::try_from(update_task_request.into_inner())?;

    let task = with_transaction(db_connection, |db| update_task_in_db(task_id, changes, db))?;

    Ok(Json(task))
}

#[delete("/tasks/<task_id>")]
pub fn delete_task(
    task_id: TaskID,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<StatusResponse>> {
    with_transaction(db_connection, |db| delete_task_from_db(task_id, db))?;
    tracing::info!(task_id, "task deleted");

    Ok(Json(StatusResponse { status: "deleted" }))
}

#[post("/tasks/<task_id>/log", data = "<body>")]
pub fn log_task(
    task_id: TaskID,
    body: String,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<StatusResponse>> {
    let done_on = match LogRequest::from_body(&body)?.done_on {
        Some(done_on) => parse_iso_date("done_on", &done_on)?,
        None => Local::now().date_naive(),
    };

    with_transaction(db_connection, |db| log_task_completion(task_id, done_on, db))?;

    Ok(Json(StatusResponse { status: "logged" }))
}

#[get("/tasks/<task_id>/logs")]
pub fn get_task_logs(
    task_id: TaskID,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<Vec<TaskLog>>> {
    let db_connection = db_connection.lock()?;

    let logs = get_task_logs_from_db(task_id, &db_connection)?;

    Ok(Json(logs))
}
