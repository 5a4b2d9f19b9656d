pub mod message;
pub mod sendgrid;
pub mod smtp;

use crate::config::Transport;
use crate::error::NotifyError;

pub use message::ComicEmail;
pub use sendgrid::SendGridMailer;
pub use smtp::SmtpMailer;

/// What the transport reported after a send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    /// The relay refused the message; `code` is its SMTP status if it gave one
    Rejected { code: Option<u16>, detail: String },
}

/// The transport chosen at configuration time
pub enum Mailer {
    SendGrid(SendGridMailer),
    Smtp(SmtpMailer),
}

impl Mailer {
    pub fn from_transport(transport: &Transport) -> Result<Self, NotifyError> {
        match transport {
            Transport::SendGrid { api_key, endpoint } => {
                Ok(Mailer::SendGrid(SendGridMailer::new(api_key, endpoint)))
            }
            Transport::Smtp(settings) => Ok(Mailer::Smtp(SmtpMailer::new(settings)?)),
        }
    }

    pub async fn send(&self, email: &ComicEmail) -> Result<SendOutcome, NotifyError> {
        match self {
            Mailer::SendGrid(mailer) => mailer.send(email).await,
            Mailer::Smtp(mailer) => mailer.send(email).await,
        }
    }
}
