//! Delivery through the SendGrid v3 mail API

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::StatusCode;
use serde::Serialize;

use super::SendOutcome;
use super::message::ComicEmail;
use crate::error::NotifyError;
use crate::scraper::http_client;

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    mime: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload<'a> {
    content: String,
    filename: &'a str,
    #[serde(rename = "type")]
    mime: &'a str,
    disposition: &'a str,
}

impl<'a> MailSend<'a> {
    fn from_email(email: &'a ComicEmail) -> Self {
        let attachments = email
            .attachment
            .iter()
            .map(|a| AttachmentPayload {
                content: BASE64.encode(&a.data),
                filename: &a.filename,
                mime: a.content_type,
                disposition: "attachment",
            })
            .collect();

        Self {
            personalizations: vec![Personalization {
                to: vec![EmailAddress { email: &email.to }],
            }],
            from: EmailAddress { email: &email.from },
            subject: &email.subject,
            // text/plain must precede text/html
            content: vec![
                Content {
                    mime: "text/plain",
                    value: &email.text,
                },
                Content {
                    mime: "text/html",
                    value: &email.html,
                },
            ],
            attachments,
        }
    }
}

#[derive(Clone)]
pub struct SendGridMailer {
    api_key: String,
    endpoint: String,
}

impl SendGridMailer {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn send(&self, email: &ComicEmail) -> Result<SendOutcome, NotifyError> {
        tracing::info!("Emailing {} via sendgrid", email.subject);

        let response = http_client()
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&MailSend::from_email(email))
            .send()
            .await
            .map_err(|e| NotifyError::Send(format!("request to sendgrid failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(SendOutcome::Accepted);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "Could not read sendgrid error body");
                String::new()
            }
        };
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NotifyError::Auth(format!(
                "sendgrid answered HTTP {}: {}",
                status.as_u16(),
                body
            ))),
            _ => Err(NotifyError::Send(format!(
                "sendgrid answered HTTP {}: {}",
                status.as_u16(),
                body
            ))),
        }
    }
}
