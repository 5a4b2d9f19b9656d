//! Delivery through an SMTP relay
//!
//! Authentication failures are errors; any other submission failure is
//! reported as `SendOutcome::Rejected` with the relay's status code.

use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::SendOutcome;
use super::message::ComicEmail;
use crate::config::SmtpSettings;
use crate::error::NotifyError;

/// 530 auth required, 534 mechanism too weak, 535 bad credentials
const AUTH_FAILURE_CODES: [u16; 3] = [530, 534, 535];

pub fn is_auth_failure(code: Option<u16>) -> bool {
    code.is_some_and(|c| AUTH_FAILURE_CODES.contains(&c))
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server).map_err(|e| {
                NotifyError::Relay {
                    server: settings.server.clone(),
                    reason: e.to_string(),
                }
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        };

        let mut builder = builder.port(settings.port);
        if let Some(creds) = &settings.credentials {
            builder = builder.credentials(Credentials::new(
                creds.username.clone(),
                creds.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            server: format!("{}:{}", settings.server, settings.port),
        })
    }

    pub async fn send(&self, email: &ComicEmail) -> Result<SendOutcome, NotifyError> {
        let message = build_message(email)?;

        tracing::info!("Emailing {} via SMTP ({})", email.subject, self.server);

        match self.transport.send(message).await {
            Ok(response) => {
                tracing::debug!(code = %response.code(), "Relay accepted message");
                Ok(SendOutcome::Accepted)
            }
            Err(e) => {
                let code = e
                    .status()
                    .and_then(|status| status.to_string().parse::<u16>().ok());

                if is_auth_failure(code) {
                    return Err(NotifyError::Auth(format!("{} refused login: {}", self.server, e)));
                }

                tracing::error!(?code, error = %e, "Relay did not accept message");
                Ok(SendOutcome::Rejected {
                    code,
                    detail: e.to_string(),
                })
            }
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|e| NotifyError::Message(format!("invalid address '{}': {}", address, e)))
}

/// Plain and HTML alternatives, plus the image when attached
pub fn build_message(email: &ComicEmail) -> Result<Message, NotifyError> {
    let alternative = MultiPart::alternative_plain_html(email.text.clone(), email.html.clone());

    let body = match &email.attachment {
        None => alternative,
        Some(attachment) => {
            let content_type = ContentType::parse(attachment.content_type)
                .map_err(|e| NotifyError::Message(e.to_string()))?;
            MultiPart::mixed().multipart(alternative).singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.data.clone(), content_type),
            )
        }
    };

    Message::builder()
        .from(mailbox(&email.from)?)
        .to(mailbox(&email.to)?)
        .subject(email.subject.clone())
        .multipart(body)
        .map_err(|e| NotifyError::Message(e.to_string()))
}
