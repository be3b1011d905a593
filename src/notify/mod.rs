pub mod smtp;

use async_trait::async_trait;

use crate::error::Result;

pub use smtp::SmtpMailer;

const BODY_HEADER: &str = "The following files are older than the allowed threshold:";

/// A plain-text alert ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

/// Builds the alert listing each newly stale file by its full remote path.
pub fn compose_alert(subject: &str, folder: &str, names: &[String]) -> AlertMessage {
    let folder = folder.trim_end_matches('/');
    let lines: Vec<String> = names
        .iter()
        .map(|name| format!("{}/{}", folder, name))
        .collect();

    AlertMessage {
        subject: subject.to_string(),
        body: format!("{}\n\n{}", BODY_HEADER, lines.join("\n")),
    }
}

/// Delivers alerts to the configured recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &AlertMessage) -> Result<()>;
}
