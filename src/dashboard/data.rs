use chrono::NaiveDate;
use serde::Serialize;

pub const SERIES_WINDOW_DAYS: u32 = 7;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub completion_rate: i64,
    pub avg_progress: i64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Dashboard {
    #[serde(flatten)]
    pub summary: Summary,
    pub daily_series: Vec<DailyCount>,
}
