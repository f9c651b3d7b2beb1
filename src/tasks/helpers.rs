use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::internal_error::{InternalError, InternalResult};

use super::data::*;

const TASK_COLUMNS: &str =
    "id, title, category, frequency, due_date, progress, completed, notes, sort_order, created_at";

/// Incomplete tasks first, then manual rank, with id as the stable tiebreak.
const TASK_ORDER: &str = "ORDER BY completed ASC, sort_order ASC, id ASC";

const LOG_PROGRESS_STEP: i64 = 10;

pub fn get_task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        frequency: row.get(3)?,
        due_date: row.get(4)?,
        progress: row.get(5)?,
        completed: row.get(6)?,
        notes: row.get(7)?,
        sort_order: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn clamp_progress(progress: i64) -> i64 {
    progress.max(0).min(MAX_PROGRESS)
}

/// Progress after one logged completion.
pub fn nudge_progress(progress: i64) -> i64 {
    if progress < MAX_PROGRESS {
        (progress + LOG_PROGRESS_STEP).min(MAX_PROGRESS)
    } else {
        progress
    }
}

/// Merges `changes` into `task`. Progress is applied before the completed
/// flag so that completing a task always leaves it at full progress.
pub fn apply_task_changes(task: &mut Task, changes: TaskChanges) {
    if let Some(title) = changes.title {
        task.title = title;
    }
    if let Some(category) = changes.category {
        task.category = category;
    }
    if let Some(notes) = changes.notes {
        task.notes = notes;
    }
    if let Some(frequency) = changes.frequency {
        task.frequency = frequency;
    }
    if let Some(due_date) = changes.due_date {
        task.due_date = due_date;
    }
    if let Some(progress) = changes.progress {
        task.progress = clamp_progress(progress);
    }
    if let Some(completed) = changes.completed {
        task.completed = completed;
        if completed && task.progress < MAX_PROGRESS {
            task.progress = MAX_PROGRESS;
        }
    }
}

pub fn get_all_tasks_from_db(db_connection: &Connection) -> InternalResult<Vec<Task>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM tasks {}",
        TASK_COLUMNS, TASK_ORDER
    ))?;

    let tasks = statement
        .query_map(params![], |row| get_task_from_row(row))?
        .collect::<rusqlite::Result<Vec<Task>>>()?;

    Ok(tasks)
}

pub fn get_pending_tasks_from_db(
    db_connection: &Connection,
    limit: usize,
) -> InternalResult<Vec<Task>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM tasks WHERE completed = 0 {} LIMIT (?1)",
        TASK_COLUMNS, TASK_ORDER
    ))?;

    let tasks = statement
        .query_map(params![limit as i64], |row| get_task_from_row(row))?
        .collect::<rusqlite::Result<Vec<Task>>>()?;

    Ok(tasks)
}

pub fn get_task_from_db(task_id: TaskID, db_connection: &Connection) -> InternalResult<Task> {
    db_connection
        .query_row(
            &format!("SELECT {} FROM tasks WHERE id = (?1)", TASK_COLUMNS),
            params![task_id],
            |row| get_task_from_row(row),
        )
        .optional()?
        .ok_or_else(|| InternalError::NotFound(format!("task {}", task_id)))
}

pub fn add_task_to_db(new_task: NewTask, db_connection: &Connection) -> InternalResult<Task> {
    let max_order: i64 = db_connection.query_row(
        "SELECT COALESCE(MAX(sort_order), 0) FROM tasks",
        params![],
        |row| row.get(0),
    )?;

    insert_task(new_task, max_order + 1, db_connection)
}

fn insert_task(
    new_task: NewTask,
    sort_order: i64,
    db_connection: &Connection,
) -> InternalResult<Task> {
    db_connection.execute(
        "INSERT INTO tasks (title, category, frequency, due_date, progress, completed, notes, sort_order, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, ?7)",
        params![
            new_task.title,
            new_task.category,
            new_task.frequency,
            new_task.due_date,
            new_task.notes,
            sort_order,
            Utc::now(),
        ],
    )?;
    let id = db_connection.last_insert_rowid();

    get_task_from_db(id, db_connection)
}

pub fn update_task_in_db(
    task_id: TaskID,
    changes: TaskChanges,
    db_connection: &Connection,
) -> InternalResult<Task> {
    let mut task = get_task_from_db(task_id, db_connection)?;
    apply_task_changes(&mut task, changes);

    db_connection.execute(
        "UPDATE tasks SET title = (?1), category = (?2), frequency = (?3), due_date = (?4),
         progress = (?5), completed = (?6), notes = (?7) WHERE id = (?8)",
        params![
            task.title,
            task.category,
            task.frequency,
            task.due_date,
            task.progress,
            task.completed,
            task.notes,
            task.id,
        ],
    )?;

    Ok(task)
}

pub fn delete_task_from_db(task_id: TaskID, db_connection: &Connection) -> InternalResult<()> {
    get_task_from_db(task_id, db_connection)?;

    db_connection.execute(
        "DELETE FROM task_logs WHERE task_id = (?1)",
        params![task_id],
    )?;
    db_connection.execute("DELETE FROM tasks WHERE id = (?1)", params![task_id])?;

    Ok(())
}

/// Ranks the listed tasks by their position and moves all of them into the
/// `completed` partition. Unknown ids are skipped. Returns how many tasks
/// were touched.
pub fn reorder_tasks_in_db(
    ordered_ids: &[TaskID],
    completed: bool,
    db_connection: &Connection,
) -> InternalResult<usize> {
    let mut statement = db_connection
        .prepare("UPDATE tasks SET sort_order = (?1), completed = (?2) WHERE id = (?3)")?;

    let mut touched = 0;
    for (index, task_id) in ordered_ids.iter().enumerate() {
        touched += statement.execute(params![index as i64, completed, task_id])?;
    }

    Ok(touched)
}

pub fn log_task_completion(
    task_id: TaskID,
    done_on: NaiveDate,
    db_connection: &Connection,
) -> InternalResult<TaskLog> {
    let task = get_task_from_db(task_id, db_connection)?;

    db_connection.execute(
        "INSERT INTO task_logs (task_id, done_on, note) VALUES (?1, ?2, 'completed')",
        params![task.id, done_on],
    )?;
    let log_id = db_connection.last_insert_rowid();

    let progress = nudge_progress(task.progress);
    if progress != task.progress {
        db_connection.execute(
            "UPDATE tasks SET progress = (?1) WHERE id = (?2)",
            params![progress, task.id],
        )?;
    }

    Ok(TaskLog {
        id: log_id,
        task_id: task.id,
        done_on,
        note: "completed".to_string(),
    })
}

pub fn get_task_logs_from_db(
    task_id: TaskID,
    db_connection: &Connection,
) -> InternalResult<Vec<TaskLog>> {
    get_task_from_db(task_id, db_connection)?;

    let mut statement = db_connection.prepare(
        "SELECT id, task_id, done_on, note FROM task_logs WHERE task_id = (?1) ORDER BY done_on ASC, id ASC",
    )?;

    let logs = statement
        .query_map(params![task_id], |row| {
            Ok(TaskLog {
                id: row.get(0)?,
                task_id: row.get(1)?,
                done_on: row.get(2)?,
                note: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<TaskLog>>>()?;

    Ok(logs)
}

const DEFAULT_TASKS: [(&str, Frequency, &str); 6] = [
    ("Drink green tea", Frequency::Daily, "wellness"),
    ("Yoga", Frequency::Daily, "fitness"),
    ("Gym", Frequency::Daily, "fitness"),
    ("10k steps", Frequency::Daily, "fitness"),
    ("Bike wash", Frequency::Weekly, "lifestyle"),
    ("Finish one book", Frequency::Weekly, "learning"),
];

/// Inserts the starter tasks when the store is empty. Returns how many
/// tasks were added.
pub fn seed_default_tasks(db_connection: &Connection) -> InternalResult<usize> {
    let count: i64 =
        db_connection.query_row("SELECT COUNT(*) FROM tasks", params![], |row| row.get(0))?;
    if count > 0 {
        return Ok(0);
    }

    for (index, (title, frequency, category)) in DEFAULT_TASKS.iter().enumerate() {
        insert_task(
            NewTask::new(title, *frequency, category),
            index as i64 + 1,
            db_connection,
        )?;
    }

    Ok(DEFAULT_TASKS.len())
}
