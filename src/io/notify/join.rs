use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::JoinConfig;

use super::{check_response, Notifier, NotifyError};

const JOIN_URL: &str = "https://joinjoaomgcd.appspot.com/_ah/api/messaging/v1/sendPush";

pub struct Join {
    config: JoinConfig,
    client: Client,
}

impl Join {
    pub fn new(config: JoinConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for Join {
    fn name(&self) -> &str {
        "Join"
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let response = self.client.get(JOIN_URL)
            .query(&[
                ("apikey", self.config.get_api_key()),
                ("deviceId", self.config.get_device_id()),
                ("title", title),
                ("text", message),
            ])
            .timeout(Duration::from_secs(30))
            .send().await?;
        check_response(response).await
    }
}
