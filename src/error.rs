use std::path::PathBuf;

use thiserror::Error;

/// Invalid or missing settings, detected before any network activity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    #[error("XKCD_DOWNLOAD must be enabled before XKCD_MAIL_ATTACHMENT will work")]
    AttachmentWithoutDownload,
}

/// Failure to obtain the latest comic from the API
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed comic json from {url}: {reason}")]
    Parse { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("unable to {action} history file {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("unable to create comic directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image download from {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("image download from {url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unable to save {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail transport rejected credentials: {0}")]
    Auth(String),

    /// The relay settings cannot be turned into a transport
    #[error("invalid SMTP relay '{server}': {reason}")]
    Relay { server: String, reason: String },

    #[error("unable to read attachment {}: {source}", .path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to build message: {0}")]
    Message(String),

    #[error("unable to send mail: {0}")]
    Send(String),
}

/// Every way a run can end unsuccessfully
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    #[error("notification authentication error: {0}")]
    NotifyAuth(String),

    #[error("notification send error: {0}")]
    NotifySend(String),

    #[error("history error: {0}")]
    History(#[from] HistoryError),
}

impl From<NotifyError> for CheckerError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Auth(msg) => CheckerError::NotifyAuth(msg),
            NotifyError::Relay { server, reason } => CheckerError::Config(ConfigError::Invalid {
                name: "XKCD_SMTP_SERVER".to_string(),
                value: server,
                reason,
            }),
            other => CheckerError::NotifySend(other.to_string()),
        }
    }
}

impl CheckerError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            CheckerError::Config(_) => 2,
            CheckerError::Fetch(_) => 3,
            CheckerError::Download(_) => 4,
            CheckerError::NotifyAuth(_) => 5,
            CheckerError::NotifySend(_) => 6,
            CheckerError::History(_) => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_auth_maps_to_auth_variant() {
        let err: CheckerError = NotifyError::Auth("535 bad credentials".to_string()).into();
        assert!(matches!(err, CheckerError::NotifyAuth(_)));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_notify_send_maps_to_send_variant() {
        let err: CheckerError = NotifyError::Send("relay unreachable".to_string()).into();
        assert!(matches!(err, CheckerError::NotifySend(_)));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_bad_relay_is_a_config_error() {
        let err: CheckerError = NotifyError::Relay {
            server: "bad host!".to_string(),
            reason: "invalid dns name".to_string(),
        }
        .into();

        assert!(matches!(
            &err,
            CheckerError::Config(ConfigError::Invalid { name, value, .. })
                if name == "XKCD_SMTP_SERVER" && value == "bad host!"
        ));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_codes_are_nonzero() {
        let config: CheckerError = ConfigError::AttachmentWithoutDownload.into();
        assert_eq!(config.exit_code(), 2);

        let history: CheckerError = HistoryError::Io {
            action: "append to",
            path: PathBuf::from("xkcd_history.txt"),
            source: std::io::Error::other("read-only"),
        }
        .into();
        assert_eq!(history.exit_code(), 7);
    }
}
