// src/services/notifier.rs

//! Report delivery by mail.

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::MailConfig;
use crate::storage::write_timestamped;

/// Delivers a text message to a recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP notifier.
///
/// Sending is skipped while any credential, the recipient, the subject or
/// the body is blank. A failed delivery is logged and the body is written
/// to `error_<timestamp>.txt` in the fallback directory instead; it never
/// fails the caller.
pub struct MailNotifier {
    config: MailConfig,
    fallback_dir: PathBuf,
}

impl MailNotifier {
    pub fn new(config: MailConfig, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            fallback_dir: fallback_dir.into(),
        }
    }

    fn build_message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message> {
        let sender: Address = self.config.username.parse().map_err(AppError::mail)?;
        let from = Mailbox::new(Some(self.config.sender_name.clone()), sender);
        let to: Mailbox = recipient.parse().map_err(AppError::mail)?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(AppError::mail)
    }

    async fn deliver(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(recipient, subject, body)?;

        let builder = if self.config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(AppError::mail)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        };
        let transport = builder
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        transport.send(message).await.map_err(AppError::mail)?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if !self.config.is_configured()
            || recipient.trim().is_empty()
            || subject.is_empty()
            || body.is_empty()
        {
            log::debug!("Mail not configured, skipping '{}'", subject);
            return Ok(());
        }

        match self.deliver(recipient, subject, body).await {
            Ok(()) => log::debug!("send email succeed!"),
            Err(e) => {
                log::error!("send email failed: {}", e);
                if let Err(write_err) = write_timestamped(&self.fallback_dir, "error", body).await {
                    log::error!(
                        "write error log failed: {}\ncontent: {}",
                        write_err,
                        body
                    );
                }
            }
        }
        Ok(())
    }
}
