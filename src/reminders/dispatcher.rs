//! Reminder composition and fan-out.
//!
//! One invocation composes a message from the pending tasks, attempts every
//! registered channel concurrently, and reports per-channel delivery. A
//! failing, hanging or panicking channel only marks its own entry as
//! undelivered; the dispatcher itself never fails.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::data::DBConnection;
use crate::internal_error::{InternalError, InternalResult};
use crate::tasks::data::Task;
use crate::tasks::helpers::get_pending_tasks_from_db;

use super::email::EmailChannel;
use super::telegram::TelegramChannel;
use super::traits::{ChannelError, ReminderChannel};
use super::whatsapp::WhatsAppChannel;

/// Number of pending tasks listed in one reminder.
pub const MAX_REMINDER_TASKS: usize = 8;

const HEADER: &str = "Your daily focus tasks:";
const ALL_DONE: &str = "- All done, great work!";
const TRAILER: &str = "Keep going on your 3-month goal.";

/// Channel name to delivered flag.
pub type DeliveryReport = BTreeMap<String, bool>;

pub fn render_message(pending: &[Task]) -> String {
    let lines = if pending.is_empty() {
        ALL_DONE.to_owned()
    } else {
        pending
            .iter()
            .take(MAX_REMINDER_TASKS)
            .map(|task| format!("- {} ({})", task.title, task.frequency))
            .collect::<Vec<String>>()
            .join("\n")
    };

    format!("{HEADER}\n{lines}\n\n{TRAILER}")
}

pub struct Dispatcher {
    db_connection: DBConnection,
    channels: Vec<Arc<dyn ReminderChannel>>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(db_connection: DBConnection, timeout: Duration) -> Self {
        Self {
            db_connection,
            channels: Vec::new(),
            timeout,
        }
    }

    pub fn with_channel(mut self, channel: impl ReminderChannel + 'static) -> Self {
        self.channels.push(Arc::new(channel));
        self
    }

    /// Registers the built-in email, telegram and whatsapp channels.
    pub fn from_config(db_connection: DBConnection, cfg: &Config) -> InternalResult<Self> {
        let timeout = cfg.reminders.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InternalError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self::new(db_connection, timeout)
            .with_channel(EmailChannel::new(&cfg.email, timeout))
            .with_channel(TelegramChannel::new(&cfg.telegram, client.clone()))
            .with_channel(WhatsAppChannel::new(&cfg.whatsapp, client)))
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn compose_message(&self) -> InternalResult<String> {
        compose_from_db(&self.db_connection)
    }

    fn undelivered(&self) -> DeliveryReport {
        self.channel_names()
            .into_iter()
            .map(|name| (name.to_owned(), false))
            .collect()
    }

    pub async fn dispatch(&self, message: &str) -> DeliveryReport {
        let attempts: Vec<_> = self
            .channels
            .iter()
            .map(|channel| {
                let channel = Arc::clone(channel);
                let message = message.to_owned();
                let timeout = self.timeout;
                let name = channel.name();
                let handle =
                    tokio::spawn(async move { attempt(channel.as_ref(), &message, timeout).await });
                (name, handle)
            })
            .collect();

        let mut report = DeliveryReport::new();
        for (name, handle) in attempts {
            let delivered = match handle.await {
                Ok(delivered) => delivered,
                Err(e) => {
                    error!(channel = name, error = %e, "reminder channel task aborted");
                    false
                }
            };
            report.insert(name.to_owned(), delivered);
        }

        report
    }

    /// Composes the reminder and sends it through every channel.
    pub async fn send_now(&self) -> DeliveryReport {
        // SQLite and the connection lock stay off the async workers.
        let db_connection = Arc::clone(&self.db_connection);
        let composed = tokio::task::spawn_blocking(move || compose_from_db(&db_connection)).await;

        let message = match composed {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                error!(error = %e, "failed to compose reminder");
                return self.undelivered();
            }
            Err(e) => {
                error!(error = %e, "reminder composition task aborted");
                return self.undelivered();
            }
        };

        let report = self.dispatch(&message).await;
        info!(?report, "reminders dispatched");
        report
    }
}

fn compose_from_db(db_connection: &DBConnection) -> InternalResult<String> {
    let db_connection = db_connection.lock()?;
    let pending = get_pending_tasks_from_db(&db_connection, MAX_REMINDER_TASKS)?;

    Ok(render_message(&pending))
}

async fn attempt(channel: &dyn ReminderChannel, message: &str, timeout: Duration) -> bool {
    let name = channel.name();
    let result = match tokio::time::timeout(timeout, channel.send(message)).await {
        Ok(result) => result,
        Err(_) => Err(ChannelError::Timeout(timeout)),
    };

    match result {
        Ok(true) => {
            debug!(channel = name, "reminder delivered");
            true
        }
        Ok(false) => {
            debug!(channel = name, "channel not configured, skipping");
            false
        }
        Err(e) => {
            warn!(channel = name, error = %e, "reminder delivery failed");
            false
        }
    }
}
