use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Notifier, NotifyError};

pub type SentNotifications = Arc<Mutex<Vec<(String, String)>>>;

/// Records everything it is asked to send.
#[derive(Default)]
pub struct DummyNotifier {
    sent: SentNotifications,
    fail: bool,
}

impl DummyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records, then reports the send as rejected.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> SentNotifications {
        self.sent.clone()
    }
}

#[async_trait]
impl Notifier for DummyNotifier {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((title.to_owned(), message.to_owned()));
        }
        if self.fail {
            return Err(NotifyError::Rejected { status: 500, body: "Dummy failure".to_owned() });
        }
        Ok(())
    }
}
