use async_trait::async_trait;
use serde_json::json;

use crate::config::TelegramConfig;

use super::traits::{ensure_success, setting, ChannelError, ReminderChannel};

/// Telegram Bot API adapter (`sendMessage`).
#[derive(Clone)]
pub struct TelegramChannel {
    bot_token: Option<String>,
    chat_id: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig, client: reqwest::Client) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            client,
        }
    }
}

#[async_trait]
impl ReminderChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<bool, ChannelError> {
        let (Some(token), Some(chat_id)) = (setting(&self.bot_token), setting(&self.chat_id))
        else {
            return Ok(false);
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": message }))
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(token: Option<&str>, chat_id: Option<&str>, api_base: &str) -> TelegramChannel {
        let cfg = TelegramConfig {
            bot_token: token.map(str::to_owned),
            chat_id: chat_id.map(str::to_owned),
            api_base: api_base.to_owned(),
        };
        TelegramChannel::new(&cfg, reqwest::Client::new())
    }

    #[tokio::test]
    async fn unconfigured_channel_reports_not_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(!channel(None, Some("42"), &server.uri()).send("hi").await.unwrap());
        assert!(!channel(Some("TOKEN"), Some(" "), &server.uri()).send("hi").await.unwrap());
    }

    #[tokio::test]
    async fn posts_message_to_bot_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "42", "text": "- Yoga (daily)" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let delivered = channel(Some("TOKEN"), Some("42"), &format!("{}/", server.uri()))
            .send("- Yoga (daily)")
            .await
            .unwrap();
        assert!(delivered);
    }

    #[tokio::test]
    async fn remote_rejection_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = channel(Some("bad"), Some("42"), &server.uri())
            .send("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Rejected { status: 401, .. }));
    }
}
