use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::PushbulletConfig;

use super::{check_response, Notifier, NotifyError};

const PUSHBULLET_URL: &str = "https://api.pushbullet.com/v2/pushes";

pub struct Pushbullet {
    config: PushbulletConfig,
    client: Client,
}

impl Pushbullet {
    pub fn new(config: PushbulletConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn body(&self, title: &str, message: &str) -> Value {
        let mut body = json!({
            "type": "note",
            "title": title,
            "body": message,
        });
        if let Some(device) = self.config.get_device_id() {
            body["device_iden"] = json!(device);
        }
        body
    }
}

#[async_trait]
impl Notifier for Pushbullet {
    fn name(&self) -> &str {
        "Pushbullet"
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let response = self.client.post(PUSHBULLET_URL)
            .header("Access-Token", self.config.get_api_key())
            .json(&self.body(title, message))
            .timeout(Duration::from_secs(30))
            .send().await?;
        check_response(response).await
    }
}
