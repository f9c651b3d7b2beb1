use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::internal_error::{InternalError, InternalResult};

pub const CONFIG_PATH_VAR: &str = "RFOCUS_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "rfocus.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub reminders: ReminderConfig,
    pub email: EmailConfig,
    pub telegram: TelegramConfig,
    pub whatsapp: WhatsAppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub seed_defaults: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "rfocus.db".to_owned(),
            seed_defaults: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReminderConfig {
    pub hour: u32,
    pub minute: u32,
    pub timeout_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            hour: 8,
            minute: 0,
            timeout_secs: 10,
        }
    }
}

impl ReminderConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Local time of day the daily reminder fires.
    pub fn fire_time(&self) -> InternalResult<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or_else(|| {
            InternalError::Config(format!(
                "invalid reminder time {:02}:{:02}",
                self.hour, self.minute
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub to: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            to: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub phone: Option<String>,
    pub api_key: Option<String>,
    pub api_base: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            phone: None,
            api_key: None,
            api_base: "https://api.callmebot.com".to_owned(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> InternalResult<()> {
        if self.database.path.trim().is_empty() {
            return Err(InternalError::Config(
                "database.path must not be empty".to_owned(),
            ));
        }
        if self.reminders.hour > 23 {
            return Err(InternalError::Config(
                "reminders.hour must be between 0 and 23".to_owned(),
            ));
        }
        if self.reminders.minute > 59 {
            return Err(InternalError::Config(
                "reminders.minute must be between 0 and 59".to_owned(),
            ));
        }
        if self.reminders.timeout_secs == 0 {
            return Err(InternalError::Config(
                "reminders.timeout_secs must be >= 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Overlays settings from environment variables, looked up through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> InternalResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = text("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(hour) = text("REMINDER_HOUR") {
            self.reminders.hour = parse_number("REMINDER_HOUR", &hour)?;
        }
        if let Some(minute) = text("REMINDER_MINUTE") {
            self.reminders.minute = parse_number("REMINDER_MINUTE", &minute)?;
        }
        if let Some(timeout) = text("REMINDER_TIMEOUT_SECS") {
            self.reminders.timeout_secs = parse_number("REMINDER_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(host) = text("SMTP_HOST") {
            self.email.smtp_host = Some(host);
        }
        if let Some(port) = text("SMTP_PORT") {
            self.email.smtp_port = parse_number("SMTP_PORT", &port)?;
        }
        if let Some(user) = text("SMTP_USER") {
            self.email.smtp_user = Some(user);
        }
        if let Some(pass) = text("SMTP_PASS") {
            self.email.smtp_pass = Some(pass);
        }
        if let Some(to) = text("REMINDER_EMAIL") {
            self.email.to = Some(to);
        }

        if let Some(token) = text("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = text("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }

        if let Some(phone) = text("WHATSAPP_PHONE") {
            self.whatsapp.phone = Some(phone);
        }
        if let Some(api_key) = text("WHATSAPP_API_KEY") {
            self.whatsapp.api_key = Some(api_key);
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> InternalResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| InternalError::Config(format!("invalid {key} '{value}': {e}")))
}

#[must_use]
pub fn default_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Reads `path` when it exists; a missing file yields the defaults.
pub fn load_from_file(path: &Path) -> InternalResult<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)?;

    toml::from_str(&raw)
        .map_err(|e| InternalError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Loads the config file, overlays the process environment and validates
/// the result.
pub fn load() -> InternalResult<Config> {
    let path = default_path();
    let mut cfg = load_from_file(&path)?;
    cfg.apply_env(|key| std::env::var(key).ok())?;
    cfg.validate()?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(cfg)
}
