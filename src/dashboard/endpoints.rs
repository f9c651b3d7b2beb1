use chrono::Local;
use rocket::serde::json::Json;
use rocket::{get, State};

use crate::data::DBConnection;
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::*;

#[get("/dashboard")]
pub fn get_dashboard(db_connection: &State<DBConnection>) -> InternalResult<Json<Dashboard>> {
    let db_connection = db_connection.lock()?;

    let dashboard = get_dashboard_from_db(Local::now().date_naive(), &db_connection)?;

    Ok(Json(dashboard))
}
