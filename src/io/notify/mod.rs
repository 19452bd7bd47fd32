use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use log::{error, info};

use crate::config::NotificationsConfig;

pub mod dummy;
pub mod email;
pub mod join;
pub mod pushbullet;
pub mod pushover;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug)]
pub enum NotifyError {
    Network(reqwest::Error),
    Rejected { status: u16, body: String },
    Email(String),
    Smtp(lettre::transport::smtp::Error),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Network(e) => write!(f, "Network Error: {}", e),
            NotifyError::Rejected { status, body } => write!(f, "Rejected with HTTP {}: {}", status, body),
            NotifyError::Email(e) => write!(f, "Email Error: {}", e),
            NotifyError::Smtp(e) => write!(f, "SMTP Error: {}", e),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Network(e)
    }
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        NotifyError::Smtp(e)
    }
}

/// Turns a non-success HTTP response into an error.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected { status: status.as_u16(), body })
}

/// Every configured channel. Sending never fails, problems are only logged.
#[derive(Default)]
pub struct Notifications {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl Notifications {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn from_config(config: &NotificationsConfig) -> Self {
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(email) = config.get_email() {
            match email::Email::new(email) {
                Ok(email) => notifiers.push(Box::new(email)),
                Err(e) => error!("Not sending email: {}", e),
            }
        }
        if let Some(pushover) = config.get_pushover() {
            notifiers.push(Box::new(pushover::Pushover::new(pushover.clone())));
        }
        if let Some(pushbullet) = config.get_pushbullet() {
            notifiers.push(Box::new(pushbullet::Pushbullet::new(pushbullet.clone())));
        }
        if let Some(join) = config.get_join() {
            notifiers.push(Box::new(join::Join::new(join.clone())));
        }
        Self::new(notifiers)
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub async fn send(&self, title: &str, message: &str) {
        if self.notifiers.is_empty() {
            info!("{}: {}", title, message);
            return;
        }
        for notifier in &self.notifiers {
            match notifier.notify(title, message).await {
                Ok(()) => info!("Sent '{}' via {}", title, notifier.name()),
                Err(e) => error!("Failed to send '{}' via {}: {}", title, notifier.name(), e),
            }
        }
    }
}
