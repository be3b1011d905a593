use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{AlertMessage, Mailer};
use crate::config::SmtpConfig;
use crate::error::{MonitorError, Result};

/// Sends alerts through an SMTP relay using STARTTLS and a login.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn server(&self) -> String {
        format!("{}:{}", self.config.server, self.config.port)
    }

    fn fail(&self, message: impl std::fmt::Display) -> MonitorError {
        MonitorError::Mail {
            server: self.server(),
            message: message.to_string(),
        }
    }

    fn build_message(&self, alert: &AlertMessage) -> Result<Message> {
        let from: Mailbox = self
            .config
            .sender
            .parse()
            .map_err(|e| self.fail(format!("bad sender address {:?}: {}", self.config.sender, e)))?;
        let to: Mailbox = self
            .config
            .receiver
            .parse()
            .map_err(|e| self.fail(format!("bad receiver address {:?}: {}", self.config.receiver, e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(alert.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body.clone())
            .map_err(|e| self.fail(e))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, alert: &AlertMessage) -> Result<()> {
        let message = self.build_message(alert)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.server)
            .map_err(|e| self.fail(e))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.sender.clone(),
                self.config.sender_password.clone(),
            ))
            .build();

        transport.send(message).await.map_err(|e| self.fail(e))?;
        log::info!("Alert sent to {} via {}", self.config.receiver, self.server());
        Ok(())
    }
}
