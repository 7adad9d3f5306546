use async_trait::async_trait;
use lettre::message::{Mailbox, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::Notifier;
use crate::config::SmtpConfig;
use crate::utils::error::{AppError, DeliveryError};

/// Sends plain-text alerts over SMTP.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address.parse::<Mailbox>().map_err(|e| DeliveryError::InvalidAddress {
        address: address.to_string(),
        message: e.to_string(),
    })
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let from_address = config.from_address.as_deref().ok_or_else(|| {
            AppError::Internal("SMTP from_address is required for email notifications".to_string())
        })?;
        let from = parse_mailbox(&format!("{} <{}>", config.from_name, from_address))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| DeliveryError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }

    pub fn build_message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message, DeliveryError> {
        Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(recipient)?)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| DeliveryError::Message(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = self.build_message(recipient, subject, body)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        tracing::debug!("Sent email alert to {}", recipient);
        Ok(())
    }
}
