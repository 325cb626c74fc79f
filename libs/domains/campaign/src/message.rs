//! Campaign message content.

use crate::error::{CampaignError, CampaignResult};
use std::path::Path;
use tracing::{info, warn};

/// File attached to every campaign email.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    /// Read an attachment from disk.
    ///
    /// A missing file is not an error: the campaign goes out without it.
    pub fn load(path: &Path) -> CampaignResult<Option<Attachment>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Attachment not found, sending without it");
                return Ok(None);
            }
            Err(e) => {
                return Err(CampaignError::Message(format!(
                    "cannot read attachment {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        info!(filename = %filename, size = bytes.len(), "Loaded attachment");
        Ok(Some(Attachment::new(filename, bytes)))
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Subject used when none is configured.
pub const DEFAULT_SUBJECT: &str = "Availability for current openings";

const DEFAULT_BODY: &str = "Hi,

I'm reaching out about roles you may currently be staffing. I'm available \
immediately and happy to share my resume or discuss opportunities.

Best regards,
";

/// Subject, body and envelope options shared by every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignMessage {
    pub subject: String,
    pub text_body: String,
    /// Display name shown next to the sender address.
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub attachment: Option<Attachment>,
}

impl CampaignMessage {
    pub fn new(subject: impl Into<String>, text_body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            text_body: text_body.into(),
            from_name: None,
            reply_to: None,
            attachment: None,
        }
    }

    /// Build the message with its body read from `body_file`, or the built-in body.
    pub fn load(subject: impl Into<String>, body_file: Option<&Path>) -> CampaignResult<Self> {
        let text_body = match body_file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                CampaignError::Message(format!("cannot read body {}: {}", path.display(), e))
            })?,
            None => DEFAULT_BODY.to_string(),
        };
        Ok(Self::new(subject, text_body))
    }

    pub fn with_from_name(mut self, from_name: Option<String>) -> Self {
        self.from_name = from_name.filter(|name| !name.is_empty());
        self
    }

    pub fn with_reply_to(mut self, reply_to: Option<String>) -> Self {
        self.reply_to = reply_to.filter(|address| !address.is_empty());
        self
    }

    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }
}
