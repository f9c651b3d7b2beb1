use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection};

use std::collections::HashMap;

use crate::internal_error::InternalResult;

use super::data::*;

fn percent(part: i64, whole: i64) -> i64 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as i64
}

pub fn get_summary_from_db(db_connection: &Connection) -> InternalResult<Summary> {
    let (total_tasks, completed_tasks, progress_sum): (i64, i64, i64) = db_connection.query_row(
        "SELECT COUNT(*), COALESCE(SUM(completed), 0), COALESCE(SUM(progress), 0) FROM tasks",
        params![],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let avg_progress = if total_tasks == 0 {
        0
    } else {
        (progress_sum as f64 / total_tasks as f64).round() as i64
    };

    Ok(Summary {
        total_tasks,
        completed_tasks,
        completion_rate: percent(completed_tasks, total_tasks),
        avg_progress,
    })
}

/// Log counts for each of the `window` days ending on `today`, oldest first.
/// Days without logs are present with a zero count.
pub fn get_daily_series_from_db(
    today: NaiveDate,
    window: u32,
    db_connection: &Connection,
) -> InternalResult<Vec<DailyCount>> {
    if window == 0 {
        return Ok(vec![]);
    }
    let first_day = today - Duration::days(i64::from(window) - 1);

    let mut statement = db_connection.prepare(
        "SELECT done_on, COUNT(id) FROM task_logs
         WHERE done_on >= (?1) AND done_on <= (?2) GROUP BY done_on",
    )?;

    let mut counts: HashMap<NaiveDate, i64> = HashMap::new();
    let mut rows = statement.query(params![first_day, today])?;
    while let Some(row) = rows.next()? {
        counts.insert(row.get(0)?, row.get(1)?);
    }

    Ok((0..i64::from(window))
        .map(|offset| {
            let date = first_day + Duration::days(offset);
            DailyCount {
                date,
                count: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect())
}

pub fn get_dashboard_from_db(
    today: NaiveDate,
    db_connection: &Connection,
) -> InternalResult<Dashboard> {
    Ok(Dashboard {
        summary: get_summary_from_db(db_connection)?,
        daily_series: get_daily_series_from_db(today, SERIES_WINDOW_DAYS, db_connection)?,
    })
}
