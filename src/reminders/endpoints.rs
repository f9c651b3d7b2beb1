use rocket::serde::json::Json;
use rocket::{post, State};

use std::sync::Arc;

use super::dispatcher::{DeliveryReport, Dispatcher};

/// Sends the reminder immediately. Always succeeds; undelivered channels are
/// reported as `false`.
#[post("/reminders/test")]
pub async fn send_reminders(dispatcher: &State<Arc<Dispatcher>>) -> Json<DeliveryReport> {
    Json(dispatcher.send_now().await)
}
