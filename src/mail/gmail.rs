//! Gmail API transport.
//!
//! Builds a `multipart/mixed` MIME message, base64url-encodes it and posts it
//! to `users/me/messages/send`.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use log::info;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{MailError, MailTransport, OutgoingMail};

const MIME_LINE_WIDTH: usize = 76;

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    /// Sender address; Gmail substitutes the authenticated account when unset.
    pub user: Option<String>,
    pub access_token: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "gmail.googleapis.com".to_string(),
            port: 443,
            use_tls: true,
            user: None,
            access_token: None,
        }
    }
}

impl MailConfig {
    pub fn send_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!(
            "{}://{}:{}/gmail/v1/users/me/messages/send",
            scheme, self.host, self.port
        )
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Clone)]
pub struct GmailTransport {
    http: reqwest::Client,
    config: MailConfig,
}

impl GmailTransport {
    pub fn new(http: reqwest::Client, config: MailConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl MailTransport for GmailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let token = self
            .config
            .access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| MailError::NotConfigured("MAIL_ACCESS_TOKEN is not set".into()))?;
        if !mail.to.contains('@') {
            return Err(MailError::InvalidRecipient(mail.to.clone()));
        }

        let from = self.config.user.as_deref().unwrap_or("me");
        let raw = URL_SAFE.encode(build_mime_message(mail, from, &new_boundary()));

        let response = self
            .http
            .post(self.config.send_url())
            .bearer_auth(token)
            .json(&json!({ "raw": raw }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let sent: SendResponse = response.json().await?;
        info!("mail to {} sent, message id {}", mail.to, sent.id);
        Ok(())
    }
}

fn new_boundary() -> String {
    format!("=_report_{}", Uuid::new_v4().simple())
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

fn wrap_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    encoded
        .as_bytes()
        .chunks(MIME_LINE_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Serialize `mail` as a MIME message with CRLF line endings.
pub fn build_mime_message(mail: &OutgoingMail, from: &str, boundary: &str) -> String {
    let mut message = String::new();
    message.push_str(&format!("From: {from}\r\n"));
    message.push_str(&format!("To: {}\r\n", mail.to));
    message.push_str(&format!("Subject: {}\r\n", encode_header(&mail.subject)));
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    ));

    message.push_str(&format!("--{boundary}\r\n"));
    message.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    message.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    message.push_str(&wrap_base64(mail.body.as_bytes()));
    message.push_str("\r\n");

    if let Some(attachment) = &mail.attachment {
        let name = encode_header(&attachment.file_name);
        message.push_str(&format!("--{boundary}\r\n"));
        message.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.content_type, name
        ));
        message.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{name}\"\r\n"
        ));
        message.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        message.push_str(&wrap_base64(&attachment.data));
        message.push_str("\r\n");
    }

    message.push_str(&format!("--{boundary}--\r\n"));
    message
}
