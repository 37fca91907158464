//! Outbound mail.
//!
//! - `gmail` - Gmail API `messages.send` transport

pub mod gmail;

pub use gmail::{GmailTransport, MailConfig};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport is not configured: {0}")]
    NotConfigured(String),
    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),
    #[error("failed to read attachment: {0}")]
    Attachment(#[source] std::io::Error),
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail service returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// Read `path` into memory, guessing the MIME type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, MailError> {
        let data = std::fs::read(path).map_err(MailError::Attachment)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// Delivers one message per call.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}
