use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use std::sync::Arc;
use std::time::Duration;

use super::dispatcher::Dispatcher;

/// Next wall-clock instant strictly after `now` at time-of-day `at`.
pub fn next_fire(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Fires the dispatcher once per day at a fixed local time.
pub struct ReminderScheduler {
    dispatcher: Arc<Dispatcher>,
    at: NaiveTime,
}

pub struct SchedulerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl ReminderScheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, at: NaiveTime) -> Self {
        Self { dispatcher, at }
    }

    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            info!(at = %self.at, "reminder scheduler started");
            // Never fire at or before the previous firing, even if the wall
            // clock lags the timer.
            let mut not_before: Option<NaiveDateTime> = None;

            loop {
                let now = Local::now().naive_local();
                let from = match not_before {
                    Some(floor) if floor > now => floor,
                    _ => now,
                };
                let fire_at = next_fire(from, self.at);
                let wait = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
                debug!(%fire_at, "next reminder scheduled");

                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = tokio::time::sleep(wait) => {
                        not_before = Some(fire_at);
                        let report = self.dispatcher.send_now().await;
                        info!(?report, "scheduled reminder sent");
                    }
                }
            }

            info!("reminder scheduler stopped");
        });

        SchedulerHandle { stop_tx, join }
    }
}

impl SchedulerHandle {
    pub async fn stop(self) {
        // The loop may already be gone; nothing to signal then.
        let _ = self.stop_tx.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "reminder scheduler ended abnormally");
        }
    }
}
