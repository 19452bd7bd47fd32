use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;

use super::{Notifier, NotifyError};

pub struct Email {
    from: Mailbox,
    to: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Email {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let from = parse_mailbox(config.get_from())?;
        let to = config.get_to().iter()
            .map(|address| parse_mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(NotifyError::Email("No recipients".to_owned()));
        }
        Ok(Self {
            from,
            to,
            transport: make_transport(config)?,
        })
    }

    fn build_message(&self, title: &str, message: &str) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(title)
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        builder.body(message.to_owned())
            .map_err(|e| NotifyError::Email(e.to_string()))
    }
}

pub(crate) fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.trim().parse::<Mailbox>()
        .map_err(|e| NotifyError::Email(format!("Invalid address '{}': {}", address, e)))
}

/// `ssl` connects over TLS straight away, `tls` upgrades with STARTTLS, neither is plain text.
fn make_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    let builder = if config.is_ssl() {
        AsyncSmtpTransport::<Tokio1Executor>::relay(config.get_server())?
    } else if config.is_tls() {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.get_server())?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.get_server())
    };
    let builder = builder.port(config.get_port());
    let builder = match (config.get_user(), config.get_password()) {
        (Some(user), Some(password)) => builder.credentials(Credentials::new(user.to_owned(), password.to_owned())),
        _ => builder,
    };
    Ok(builder.build())
}

#[async_trait]
impl Notifier for Email {
    fn name(&self) -> &str {
        "Email"
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let email = self.build_message(title, message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}
