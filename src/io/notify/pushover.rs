use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::PushoverConfig;

use super::{check_response, Notifier, NotifyError};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

pub struct Pushover {
    config: PushoverConfig,
    client: Client,
}

impl Pushover {
    pub fn new(config: PushoverConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn form(&self, user: &str, title: &str, message: &str) -> Vec<(&'static str, String)> {
        vec![
            ("token", self.config.get_api_token().to_owned()),
            ("user", user.to_owned()),
            ("title", title.to_owned()),
            ("message", message.to_owned()),
            ("priority", self.config.get_priority().to_string()),
        ]
    }
}

#[async_trait]
impl Notifier for Pushover {
    fn name(&self) -> &str {
        "Pushover"
    }

    /// One message per user key.
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        for user in self.config.get_user_keys() {
            let response = self.client.post(PUSHOVER_URL)
                .form(&self.form(user, title, message))
                .timeout(Duration::from_secs(30))
                .send().await?;
            check_response(response).await?;
        }
        Ok(())
    }
}
