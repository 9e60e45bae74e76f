use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::SmtpConfig;

const SENDER_NAME: &str = "Changelog Checker";

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hand the message to the transport. `true` only means it was accepted.
    async fn send(&self, mail: &OutgoingMail) -> bool;
}

/// Plain-text alternative for clients that won't render HTML.
fn plain_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 100).unwrap_or_else(|_| html.to_string())
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from_address: &str) -> Result<Self> {
        let mut builder = SmtpTransport::starttls_relay(&smtp.host)
            .context("Failed to configure SMTP relay")?
            .port(smtp.port);
        if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = Mailbox::new(
            Some(SENDER_NAME.to_string()),
            from_address.parse::<lettre::Address>().context("ADMIN_EMAIL is not a valid address")?,
        );
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build(&self, mail: &OutgoingMail) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse::<Mailbox>().context("invalid recipient address")?)
            .subject(mail.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                plain_text(&mail.html_body),
                mail.html_body.clone(),
            ))
            .context("Failed to build message")
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> bool {
        let message = match self.build(mail) {
            Ok(message) => message,
            Err(e) => {
                warn!(to = %mail.to, error = %e, "mail rejected before sending");
                return false;
            }
        };

        // lettre's SMTP transport is blocking.
        let transport = self.transport.clone();
        let sent = tokio::task::spawn_blocking(move || transport.send(&message)).await;
        match sent {
            Ok(Ok(_)) => {
                info!(to = %mail.to, subject = %mail.subject, "mail sent");
                true
            }
            Ok(Err(e)) => {
                warn!(to = %mail.to, error = %e, "SMTP send failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "mail task join failed");
                false
            }
        }
    }
}

/// Used when no SMTP relay is configured: logs and refuses every message.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, mail: &OutgoingMail) -> bool {
        warn!(to = %mail.to, subject = %mail.subject, "SMTP not configured, mail dropped");
        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Records every message and answers with a fixed verdict.
    pub(crate) struct RecordingMailer {
        pub accept: bool,
        pub sent: Mutex<Vec<OutgoingMail>>,
    }

    impl RecordingMailer {
        pub(crate) fn new(accept: bool) -> Self {
            Self {
                accept,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: &OutgoingMail) -> bool {
            self.sent.lock().await.push(mail.clone());
            self.accept
        }
    }

    #[test]
    fn plain_text_strips_markup() {
        let text = plain_text("<h1>Weekly</h1><p>All good</p>");
        assert!(text.contains("Weekly"));
        assert!(text.contains("All good"));
        assert!(!text.contains("<p>"));
    }

    #[tokio::test]
    async fn disabled_mailer_refuses() {
        let mail = OutgoingMail {
            to: "ops@example.com".into(),
            subject: "s".into(),
            html_body: "<p>b</p>".into(),
        };
        assert!(!DisabledMailer.send(&mail).await);
    }

    #[test]
    fn smtp_mailer_builds_multipart_message() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: None,
            password: None,
        };
        let mailer = SmtpMailer::new(&smtp, "admin@example.com").unwrap();
        let message = mailer
            .build(&OutgoingMail {
                to: "ops@example.com".into(),
                subject: "Weekly Changelog AI Summaries".into(),
                html_body: "<h1>Weekly Changelog Summaries</h1>".into(),
            })
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Weekly Changelog AI Summaries"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Changelog Checker"));
    }

    #[test]
    fn smtp_mailer_rejects_bad_recipient() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: None,
            password: None,
        };
        let mailer = SmtpMailer::new(&smtp, "admin@example.com").unwrap();
        let built = mailer.build(&OutgoingMail {
            to: "not an address".into(),
            subject: "s".into(),
            html_body: String::new(),
        });
        assert!(built.is_err());
    }
}
