//! SMTP transport using lettre.
//!
//! A connection is opened per send with the leased account's credentials,
//! since the account may change between consecutive recipients.

use super::{MailTransport, classify_failure};
use crate::message::CampaignMessage;
use crate::models::{Recipient, SendFailure, SenderAccount};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::time::Duration;
use tracing::{debug, error, info};

/// SMTP server settings shared by every sender account.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// STARTTLS submission port.
    pub port: u16,
    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// STARTTLS SMTP transport authenticating as the leased account.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    fn build_transport(
        &self,
        account: &SenderAccount,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendFailure> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| SendFailure::rejected(format!("Failed to create SMTP relay: {}", e)))?;

        Ok(builder
            .port(self.config.port)
            .timeout(Some(self.config.timeout))
            .credentials(Credentials::new(
                account.identity.clone(),
                account.secret.clone(),
            ))
            .build())
    }

    /// Build the MIME message for one recipient.
    pub fn build_message(
        account: &SenderAccount,
        recipient: &Recipient,
        message: &CampaignMessage,
    ) -> Result<Message, SendFailure> {
        let address = account
            .identity
            .parse()
            .map_err(|e| SendFailure::rejected(format!("Invalid sender address: {}", e)))?;
        let from = Mailbox::new(message.from_name.clone(), address);

        let to: Mailbox = recipient.address.parse().map_err(|e| {
            SendFailure::rejected(format!("Invalid recipient address '{}': {}", recipient.address, e))
        })?;

        let mut builder = Message::builder().from(from).to(to).subject(&message.subject);

        if let Some(reply_to) = &message.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|e| SendFailure::rejected(format!("Invalid reply-to address: {}", e)))?;
            builder = builder.reply_to(reply_to);
        }

        let mut body = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(message.text_body.clone()),
        );

        if let Some(attachment) = &message.attachment {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| SendFailure::rejected(format!("Invalid attachment type: {}", e)))?;
            body = body.singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.bytes.clone(), content_type),
            );
        }

        builder
            .multipart(body)
            .map_err(|e| SendFailure::rejected(format!("Failed to build email message: {}", e)))
    }
}

fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> SendFailure {
    let code = err
        .status()
        .and_then(|code| code.to_string().parse::<u16>().ok());
    classify_failure(code, &err.to_string())
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(
        &self,
        account: &SenderAccount,
        recipient: &Recipient,
        message: &CampaignMessage,
    ) -> Result<(), SendFailure> {
        debug!(
            to = %recipient.address,
            from = %account.identity,
            host = %self.config.host,
            port = self.config.port,
            has_attachment = message.attachment.is_some(),
            "Sending email via SMTP"
        );

        let email = Self::build_message(account, recipient, message)?;
        let transport = self.build_transport(account)?;

        transport.send(email).await.map_err(|e| {
            error!(to = %recipient.address, from = %account.identity, error = %e, "SMTP send failed");
            classify_smtp_error(&e)
        })?;

        info!(to = %recipient.address, from = %account.identity, "Email sent");
        Ok(())
    }
}
