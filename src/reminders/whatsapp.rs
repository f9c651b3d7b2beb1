use async_trait::async_trait;

use crate::config::WhatsAppConfig;

use super::traits::{ensure_success, setting, ChannelError, ReminderChannel};

/// WhatsApp delivery through the CallMeBot webhook API.
#[derive(Clone)]
pub struct WhatsAppChannel {
    phone: Option<String>,
    api_key: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: &WhatsAppConfig, client: reqwest::Client) -> Self {
        Self {
            phone: config.phone.clone(),
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            client,
        }
    }
}

#[async_trait]
impl ReminderChannel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, message: &str) -> Result<bool, ChannelError> {
        let (Some(phone), Some(api_key)) = (setting(&self.phone), setting(&self.api_key)) else {
            return Ok(false);
        };

        let url = format!("{}/whatsapp.php", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[("phone", phone), ("text", message), ("apikey", api_key)])
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(phone: Option<&str>, api_key: Option<&str>, api_base: &str) -> WhatsAppChannel {
        let cfg = WhatsAppConfig {
            phone: phone.map(str::to_owned),
            api_key: api_key.map(str::to_owned),
            api_base: api_base.to_owned(),
        };
        WhatsAppChannel::new(&cfg, reqwest::Client::new())
    }

    #[tokio::test]
    async fn sends_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whatsapp.php"))
            .and(query_param("phone", "+15550100"))
            .and(query_param("text", "Your daily focus tasks:"))
            .and(query_param("apikey", "k3y"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let delivered = channel(Some("+15550100"), Some("k3y"), &server.uri())
            .send("Your daily focus tasks:")
            .await
            .unwrap();
        assert!(delivered);
    }

    #[tokio::test]
    async fn missing_api_key_is_unconfigured() {
        let delivered = channel(Some("+15550100"), None, "http://127.0.0.1:9")
            .send("hi")
            .await
            .unwrap();
        assert!(!delivered);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = channel(Some("+15550100"), Some("k3y"), &server.uri())
            .send("hi")
            .await;
        assert!(matches!(
            result,
            Err(ChannelError::Rejected { status: 503, .. })
        ));
    }
}
