use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::internal_error::InternalResult;

use super::data::*;

/// Percentage of the goal window that has elapsed by `today`, in [0, 100].
///
/// This is calendar progress only; it does not look at task completion.
/// A zero-length window counts as one day, and a window that has already
/// closed (today on or past both dates) is always 100.
pub fn timeline_progress(goal: &Goal, today: NaiveDate) -> i64 {
    if today >= goal.start_date && today >= goal.end_date {
        return 100;
    }

    let total_days = (goal.end_date - goal.start_date).num_days().max(1);
    let elapsed = (today - goal.start_date).num_days().max(0);

    let percent = (100.0 * elapsed as f64 / total_days as f64).round() as i64;
    percent.max(0).min(100)
}

pub fn goal_view(goal: Goal, today: NaiveDate) -> GoalView {
    let timeline_progress = timeline_progress(&goal, today);

    GoalView {
        id: goal.id,
        title: goal.title,
        description: goal.description,
        start_date: goal.start_date,
        end_date: goal.end_date,
        timeline_progress,
    }
}

pub fn get_goal_from_db(db_connection: &Connection) -> InternalResult<Option<Goal>> {
    let goal = db_connection
        .query_row(
            "SELECT id, title, description, start_date, end_date FROM goals ORDER BY id DESC LIMIT 1",
            params![],
            |row| {
                Ok(Goal {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    start_date: row.get(3)?,
                    end_date: row.get(4)?,
                })
            },
        )
        .optional()?;

    Ok(goal)
}

/// Creates the goal on first write and overwrites it in place afterwards.
pub fn upsert_goal_in_db(input: GoalInput, db_connection: &Connection) -> InternalResult<Goal> {
    let id = match get_goal_from_db(db_connection)? {
        Some(existing) => {
            db_connection.execute(
                "UPDATE goals SET title = (?1), description = (?2), start_date = (?3), end_date = (?4)
                 WHERE id = (?5)",
                params![
                    input.title,
                    input.description,
                    input.start_date,
                    input.end_date,
                    existing.id
                ],
            )?;
            existing.id
        }
        None => {
            db_connection.execute(
                "INSERT INTO goals (title, description, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
                params![
                    input.title,
                    input.description,
                    input.start_date,
                    input.end_date
                ],
            )?;
            db_connection.last_insert_rowid()
        }
    };

    Ok(Goal {
        id,
        title: input.title,
        description: input.description,
        start_date: input.start_date,
        end_date: input.end_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_connection;
    use crate::internal_error::InternalError;
    use std::convert::TryFrom;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal(start: NaiveDate, end: NaiveDate) -> Goal {
        Goal {
            id: 1,
            title: "Get fit".to_string(),
            description: String::new(),
            start_date: start,
            end_date: end,
        }
    }

    fn input(title: &str, start: &str, end: &str) -> InternalResult<GoalInput> {
        GoalInput::try_from(UpsertGoalRequest {
            title: title.to_string(),
            description: None,
            start_date: start.to_string(),
            end_date: end.to_string(),
        })
    }

    #[test]
    fn timeline_progress_tracks_elapsed_fraction() {
        let g = goal(date(2024, 1, 1), date(2024, 1, 11));

        assert_eq!(timeline_progress(&g, date(2023, 12, 1)), 0);
        assert_eq!(timeline_progress(&g, date(2024, 1, 1)), 0);
        assert_eq!(timeline_progress(&g, date(2024, 1, 6)), 50);
        assert_eq!(timeline_progress(&g, date(2024, 1, 11)), 100);
        assert_eq!(timeline_progress(&g, date(2024, 3, 1)), 100);
    }

    #[test]
    fn timeline_progress_rounds_to_nearest() {
        let g = goal(date(2024, 1, 1), date(2024, 1, 4));
        // 1/3 and 2/3 of the window
        assert_eq!(timeline_progress(&g, date(2024, 1, 2)), 33);
        assert_eq!(timeline_progress(&g, date(2024, 1, 3)), 67);
    }

    #[test]
    fn same_day_goal_is_complete_once_started() {
        let g = goal(date(2024, 5, 5), date(2024, 5, 5));

        assert_eq!(timeline_progress(&g, date(2024, 5, 4)), 0);
        assert_eq!(timeline_progress(&g, date(2024, 5, 5)), 100);
        assert_eq!(timeline_progress(&g, date(2024, 5, 6)), 100);
    }

    #[test]
    fn inverted_window_does_not_divide_by_zero() {
        let g = goal(date(2024, 5, 10), date(2024, 5, 1));
        assert_eq!(timeline_progress(&g, date(2024, 5, 5)), 0);
        assert_eq!(timeline_progress(&g, date(2024, 5, 20)), 100);
    }

    #[test]
    fn get_on_empty_store_is_absent() {
        let db = memory_connection();
        assert_eq!(get_goal_from_db(&db).unwrap(), None);
    }

    #[test]
    fn upsert_creates_then_overwrites_in_place() {
        let db = memory_connection();

        let created =
            upsert_goal_in_db(input("Run a 10k", "2024-01-01", "2024-04-01").unwrap(), &db)
                .unwrap();
        let updated =
            upsert_goal_in_db(input("Run a half", "2024-02-01", "2024-05-01").unwrap(), &db)
                .unwrap();

        assert_eq!(created.id, updated.id);
        let stored = get_goal_from_db(&db).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.title, "Run a half");

        let count: i64 = db
            .query_row("SELECT COUNT(*) FROM goals", params![], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn upsert_rejects_unparseable_dates() {
        assert!(matches!(
            input("Run", "next monday", "2024-04-01"),
            Err(InternalError::Validation(_))
        ));
        assert!(matches!(
            input("Run", "2024-01-01", ""),
            Err(InternalError::Validation(_))
        ));
    }
}
