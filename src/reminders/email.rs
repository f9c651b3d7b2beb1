use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use std::time::Duration;

use crate::config::EmailConfig;

use super::traits::{setting, ChannelError, ReminderChannel};

pub const SUBJECT: &str = "Daily Task Reminder";

/// SMTP delivery over a STARTTLS relay.
#[derive(Clone)]
pub struct EmailChannel {
    config: EmailConfig,
    timeout: Duration,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig, timeout: Duration) -> Self {
        Self {
            config: config.clone(),
            timeout,
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox, ChannelError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| ChannelError::Email(format!("'{address}': {e}")))
}

pub fn build_message(from: &str, to: &str, body: &str) -> Result<Message, ChannelError> {
    Message::builder()
        .from(mailbox(from)?)
        .to(mailbox(to)?)
        .subject(SUBJECT)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_owned())
        .map_err(|e| ChannelError::Email(e.to_string()))
}

#[async_trait]
impl ReminderChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, message: &str) -> Result<bool, ChannelError> {
        let cfg = &self.config;
        let (Some(host), Some(user), Some(pass), Some(to)) = (
            setting(&cfg.smtp_host),
            setting(&cfg.smtp_user),
            setting(&cfg.smtp_pass),
            setting(&cfg.to),
        ) else {
            return Ok(false);
        };

        let email = build_message(user, to, message)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(user.to_owned(), pass.to_owned()))
            .timeout(Some(self.timeout))
            .build();

        transport.send(email).await?;

        Ok(true)
    }
}
