use anyhow::Context;
use rocket::{routes, Build, Rocket};
use tracing::info;

use std::path::Path;
use std::sync::Arc;

mod config;
mod dashboard;
mod data;
mod goal;
mod internal_error;
mod reminders;
mod tasks;

use data::{open_database, with_transaction, DBConnection};
use reminders::dispatcher::Dispatcher;
use reminders::scheduler::ReminderScheduler;

fn build_rocket(db_connection: DBConnection, dispatcher: Arc<Dispatcher>) -> Rocket<Build> {
    rocket::build()
        .manage(db_connection)
        .manage(dispatcher)
        .mount(
            "/api",
            routes![
                tasks::endpoints::get_tasks,
                tasks::endpoints::create_task,
                tasks::endpoints::reorder_tasks,
                tasks::endpoints::update_task,
                tasks::endpoints::delete_task,
                tasks::endpoints::log_task,
                tasks::endpoints::get_task_logs,
                dashboard::endpoints::get_dashboard,
                goal::endpoints::get_goal,
                goal::endpoints::upsert_goal,
                reminders::endpoints::send_reminders,
            ],
        )
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = config::load().context("failed to load configuration")?;

    let db_connection = open_database(Path::new(&cfg.database.path))
        .with_context(|| format!("failed to open database at {}", cfg.database.path))?;
    if cfg.database.seed_defaults {
        let seeded = with_transaction(&db_connection, tasks::helpers::seed_default_tasks)?;
        if seeded > 0 {
            info!(seeded, "seeded default tasks");
        }
    }

    let dispatcher = Arc::new(Dispatcher::from_config(db_connection.clone(), &cfg)?);
    info!(channels = ?dispatcher.channel_names(), "reminder channels registered");

    let scheduler =
        ReminderScheduler::new(Arc::clone(&dispatcher), cfg.reminders.fire_time()?).start();

    let launched = build_rocket(db_connection, dispatcher).launch().await;
    scheduler.stop().await;
    launched.map_err(|e| anyhow::anyhow!("server failed: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::{ContentType, Status};
    use rocket::local::blocking::Client;
    use serde_json::{json, Value};

    use crate::config::Config;
    use crate::data::memory_database;

    fn client() -> Client {
        let db_connection = memory_database();
        let dispatcher =
            Dispatcher::from_config(db_connection.clone(), &Config::default()).unwrap();
        Client::tracked(build_rocket(db_connection, Arc::new(dispatcher))).unwrap()
    }

    fn create(client: &Client, body: Value) -> Value {
        let response = client
            .post("/api/tasks")
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Created);
        response.into_json().unwrap()
    }

    #[test]
    fn create_then_list_tasks() {
        let client = client();

        let task = create(&client, json!({ "title": "  Read  ", "frequency": "weekly" }));
        assert_eq!(task["title"], "Read");
        assert_eq!(task["frequency"], "weekly");
        assert_eq!(task["category"], "personal");
        assert_eq!(task["progress"], 0);
        assert_eq!(task["completed"], false);
        assert_eq!(task["sort_order"], 1);

        let tasks: Value = client.get("/api/tasks").dispatch().into_json().unwrap();
        assert_eq!(tasks.as_array().unwrap().len(), 1);
    }

    #[test]
    fn invalid_input_is_a_bad_request() {
        let client = client();

        let response = client
            .post("/api/tasks")
            .header(ContentType::JSON)
            .body(json!({ "title": "Run", "frequency": "hourly" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["error"], "Invalid frequency");

        let response = client
            .post("/api/tasks")
            .header(ContentType::JSON)
            .body(json!({ "title": "   " }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);

        let tasks: Value = client.get("/api/tasks").dispatch().into_json().unwrap();
        assert_eq!(tasks, json!([]));
    }

    #[test]
    fn update_with_unknown_frequency_keeps_the_stored_one() {
        let client = client();
        let task = create(&client, json!({ "title": "Bike wash", "frequency": "weekly" }));

        let response = client
            .patch(format!("/api/tasks/{}", task["id"]))
            .header(ContentType::JSON)
            .body(json!({ "frequency": "yearly", "notes": "chain too" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let tasks: Value = client.get("/api/tasks").dispatch().into_json().unwrap();
        assert_eq!(tasks[0]["frequency"], "weekly");
        assert_eq!(tasks[0]["notes"], "chain too");
    }

    #[test]
    fn malformed_log_body_writes_nothing() {
        let client = client();
        let task = create(&client, json!({ "title": "Yoga" }));
        let log_uri = format!("/api/tasks/{}/log", task["id"]);

        for body in [
            r#"{"done_on": 20240301}"#,
            r#"{"done_on": "2024-03-01""#,
            r#"{"done_on": "03/01/2024"}"#,
        ] {
            let response = client
                .post(log_uri.as_str())
                .header(ContentType::JSON)
                .body(body)
                .dispatch();
            assert_eq!(response.status(), Status::BadRequest, "body {}", body);
        }

        let logs: Value = client
            .get(format!("/api/tasks/{}/logs", task["id"]))
            .dispatch()
            .into_json()
            .unwrap();
        assert_eq!(logs, json!([]));

        let tasks: Value = client.get("/api/tasks").dispatch().into_json().unwrap();
        assert_eq!(tasks[0]["progress"], 0);
    }

    #[test]
    fn explicit_log_date_is_recorded() {
        let client = client();
        let task = create(&client, json!({ "title": "Gym" }));

        let response = client
            .post(format!("/api/tasks/{}/log", task["id"]))
            .header(ContentType::JSON)
            .body(json!({ "done_on": "2024-03-01" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let logs: Value = client
            .get(format!("/api/tasks/{}/logs", task["id"]))
            .dispatch()
            .into_json()
            .unwrap();
        assert_eq!(logs[0]["done_on"], "2024-03-01");
    }

    #[test]
    fn unknown_task_is_not_found() {
        let client = client();

        let response = client
            .patch("/api/tasks/99")
            .header(ContentType::JSON)
            .body(json!({ "progress": 50 }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let response = client.post("/api/tasks/99/log").dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn patch_completion_forces_full_progress() {
        let client = client();
        let task = create(&client, json!({ "title": "Gym" }));

        let updated: Value = client
            .patch(format!("/api/tasks/{}", task["id"]))
            .header(ContentType::JSON)
            .body(json!({ "progress": 30, "completed": true }).to_string())
            .dispatch()
            .into_json()
            .unwrap();
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["progress"], 100);
    }

    #[test]
    fn reorder_moves_tasks_between_partitions() {
        let client = client();
        let a = create(&client, json!({ "title": "A" }));
        let b = create(&client, json!({ "title": "B" }));

        let response = client
            .post("/api/tasks/reorder")
            .header(ContentType::JSON)
            .body(json!({ "ordered_ids": [b["id"], a["id"]], "completed": false }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let tasks: Value = client.get("/api/tasks").dispatch().into_json().unwrap();
        let titles: Vec<&str> = tasks
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn logging_feeds_the_dashboard() {
        let client = client();
        let task = create(&client, json!({ "title": "Yoga" }));

        let response = client
            .post(format!("/api/tasks/{}/log", task["id"]))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let dashboard: Value = client.get("/api/dashboard").dispatch().into_json().unwrap();
        let series = dashboard["daily_series"].as_array().unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series[6]["count"], 1);
        assert_eq!(dashboard["total_tasks"], 1);
        assert_eq!(dashboard["avg_progress"], 10);

        let logs: Value = client
            .get(format!("/api/tasks/{}/logs", task["id"]))
            .dispatch()
            .into_json()
            .unwrap();
        assert_eq!(logs.as_array().unwrap().len(), 1);
    }

    #[test]
    fn goal_is_empty_until_saved() {
        let client = client();

        let goal: Value = client.get("/api/goal").dispatch().into_json().unwrap();
        assert_eq!(goal, json!({}));

        let response = client
            .post("/api/goal")
            .header(ContentType::JSON)
            .body(
                json!({
                    "title": "Ship it",
                    "start_date": "2020-01-01",
                    "end_date": "2020-04-01"
                })
                .to_string(),
            )
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let saved: Value = response.into_json().unwrap();
        assert_eq!(saved["timeline_progress"], 100);

        let goal: Value = client.get("/api/goal").dispatch().into_json().unwrap();
        assert_eq!(goal["title"], "Ship it");
    }

    #[test]
    fn unconfigured_reminders_report_every_channel_false() {
        let client = client();

        let response = client.post("/api/reminders/test").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let report: Value = response.into_json().unwrap();
        assert_eq!(
            report,
            json!({ "email": false, "telegram": false, "whatsapp": false })
        );
    }
}
