//! Runtime configuration loaded from `XKCD_*` environment variables
//!
//! A `.env` file in the working directory is read first if present. All
//! validation happens here, once, so the rest of the run can rely on a
//! consistent `Config`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scraper::xkcd::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://xkcd.com/info.0.json";
pub const DEFAULT_SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
pub const DEFAULT_HISTORY_FILE: &str = "xkcd_history.txt";
pub const DEFAULT_COMIC_DIR: &str = "comics";

const CONFIG_PREFIX: &str = "XKCD_";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_RETRY_DELAY_SECS: u64 = 60;

/// Which transport delivers the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailMethod {
    SendGrid,
    Smtp,
}

impl FromStr for MailMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sendgrid" => Ok(MailMethod::SendGrid),
            "smtp" => Ok(MailMethod::Smtp),
            _ => Err("expected 'sendgrid' or 'smtp'".to_string()),
        }
    }
}

impl fmt::Display for MailMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailMethod::SendGrid => write!(f, "sendgrid"),
            MailMethod::Smtp => write!(f, "smtp"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub starttls: bool,
    pub credentials: Option<SmtpCredentials>,
}

/// The selected transport together with the settings it needs
#[derive(Clone, PartialEq, Eq)]
pub enum Transport {
    SendGrid { api_key: String, endpoint: String },
    Smtp(SmtpSettings),
}

impl Transport {
    pub fn method(&self) -> MailMethod {
        match self {
            Transport::SendGrid { .. } => MailMethod::SendGrid,
            Transport::Smtp(_) => MailMethod::Smtp,
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::SendGrid { endpoint, .. } => f
                .debug_struct("SendGrid")
                .field("api_key", &"<redacted>")
                .field("endpoint", endpoint)
                .finish(),
            Transport::Smtp(settings) => f.debug_tuple("Smtp").field(settings).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub transport: Transport,
    pub mail_to: String,
    pub mail_from: String,
    /// Whether to save the image locally. Required for attachments.
    pub download: bool,
    /// Whether to attach the image in addition to the inline `<img>`
    pub mail_attachment: bool,
    pub api_url: String,
    pub history_file: PathBuf,
    pub comic_dir: PathBuf,
    pub retry_delay: Duration,
}

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Keys passed to `lookup` carry the `XKCD_` prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings { lookup };

        let method: MailMethod = settings
            .parsed("MAIL_METHOD")?
            .ok_or_else(|| ConfigError::Missing(settings.key("MAIL_METHOD")))?;
        let mail_to = settings.required("MAIL_TO")?;
        let mail_from = settings.required("MAIL_FROM")?;

        let download = settings.boolean("DOWNLOAD", true)?;
        let mail_attachment = settings.boolean("MAIL_ATTACHMENT", true)?;
        if mail_attachment && !download {
            return Err(ConfigError::AttachmentWithoutDownload);
        }

        let transport = match method {
            MailMethod::SendGrid => Transport::SendGrid {
                api_key: settings.required("SENDGRID_API_KEY")?,
                endpoint: settings
                    .string("SENDGRID_API_URL")
                    .unwrap_or_else(|| DEFAULT_SENDGRID_URL.to_string()),
            },
            MailMethod::Smtp => Transport::Smtp(SmtpSettings {
                server: settings.required("SMTP_SERVER")?,
                port: settings.parsed("SMTP_PORT")?.unwrap_or(DEFAULT_SMTP_PORT),
                starttls: settings.boolean("SMTP_TTLS", true)?,
                credentials: settings.smtp_credentials()?,
            }),
        };

        let retry_delay_secs = settings
            .parsed("RETRY_DELAY_SECS")?
            .unwrap_or(DEFAULT_RETRY_DELAY_SECS);

        Ok(Config {
            transport,
            mail_to,
            mail_from,
            download,
            mail_attachment,
            api_url: settings
                .string("API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            history_file: settings
                .string("HISTORY_FILE")
                .unwrap_or_else(|| DEFAULT_HISTORY_FILE.to_string())
                .into(),
            comic_dir: settings
                .string("COMIC_DIR")
                .unwrap_or_else(|| DEFAULT_COMIC_DIR.to_string())
                .into(),
            retry_delay: Duration::from_secs(retry_delay_secs),
        })
    }

    pub fn method(&self) -> MailMethod {
        self.transport.method()
    }

    /// One retry after `retry_delay`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::retry_once(self.retry_delay)
    }
}

struct Settings<F> {
    lookup: F,
}

impl<F> Settings<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(&self, item: &str) -> String {
        format!("{}{}", CONFIG_PREFIX, item)
    }

    /// Empty values count as unset
    fn string(&self, item: &str) -> Option<String> {
        (self.lookup)(&self.key(item))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, item: &str) -> Result<String, ConfigError> {
        self.string(item)
            .ok_or_else(|| ConfigError::Missing(self.key(item)))
    }

    fn parsed<T>(&self, item: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.string(item) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
                name: self.key(item),
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn boolean(&self, item: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.string(item) else {
            return Ok(default);
        };

        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name: self.key(item),
                value,
                reason: "expected true or false".to_string(),
            }),
        }
    }

    fn smtp_credentials(&self) -> Result<Option<SmtpCredentials>, ConfigError> {
        match (self.string("SMTP_USERNAME"), self.string("SMTP_PASSWORD")) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => Ok(Some(SmtpCredentials { username, password })),
            (Some(_), None) => Err(ConfigError::Missing(self.key("SMTP_PASSWORD"))),
            (None, Some(_)) => Err(ConfigError::Missing(self.key("SMTP_USERNAME"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    fn sendgrid_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("XKCD_MAIL_METHOD", "sendgrid"),
            ("XKCD_MAIL_TO", "reader@example.com"),
            ("XKCD_MAIL_FROM", "checker@example.com"),
            ("XKCD_SENDGRID_API_KEY", "SG.test-key"),
        ]
    }

    #[test]
    fn test_sendgrid_defaults() {
        let config = load(&sendgrid_vars()).unwrap();

        assert_eq!(config.method(), MailMethod::SendGrid);
        assert!(config.download);
        assert!(config.mail_attachment);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.history_file, PathBuf::from(DEFAULT_HISTORY_FILE));
        assert_eq!(config.comic_dir, PathBuf::from(DEFAULT_COMIC_DIR));
        assert_eq!(config.retry_delay, Duration::from_secs(60));
        assert_eq!(
            config.transport,
            Transport::SendGrid {
                api_key: "SG.test-key".to_string(),
                endpoint: DEFAULT_SENDGRID_URL.to_string(),
            }
        );
    }

    #[test]
    fn test_attachment_without_download_is_rejected() {
        let mut vars = sendgrid_vars();
        vars.push(("XKCD_DOWNLOAD", "false"));
        vars.push(("XKCD_MAIL_ATTACHMENT", "true"));

        assert_eq!(load(&vars).unwrap_err(), ConfigError::AttachmentWithoutDownload);
    }

    #[test]
    fn test_download_disabled_without_attachment_is_fine() {
        let mut vars = sendgrid_vars();
        vars.push(("XKCD_DOWNLOAD", "False"));
        vars.push(("XKCD_MAIL_ATTACHMENT", "False"));

        let config = load(&vars).unwrap();
        assert!(!config.download);
        assert!(!config.mail_attachment);
    }

    #[test]
    fn test_sendgrid_requires_api_key() {
        let vars: Vec<_> = sendgrid_vars()
            .into_iter()
            .filter(|(k, _)| *k != "XKCD_SENDGRID_API_KEY")
            .collect();

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("XKCD_SENDGRID_API_KEY".to_string())
        );
    }

    #[test]
    fn test_empty_api_key_counts_as_missing() {
        let mut vars = sendgrid_vars();
        vars.retain(|(k, _)| *k != "XKCD_SENDGRID_API_KEY");
        vars.push(("XKCD_SENDGRID_API_KEY", "  "));

        assert!(matches!(load(&vars), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_missing_mail_method() {
        let vars = [("XKCD_MAIL_TO", "a@example.com"), ("XKCD_MAIL_FROM", "b@example.com")];
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("XKCD_MAIL_METHOD".to_string())
        );
    }

    #[test]
    fn test_unknown_mail_method() {
        let mut vars = sendgrid_vars();
        vars.retain(|(k, _)| *k != "XKCD_MAIL_METHOD");
        vars.push(("XKCD_MAIL_METHOD", "carrier-pigeon"));

        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_smtp_settings() {
        let vars = [
            ("XKCD_MAIL_METHOD", "SMTP"),
            ("XKCD_MAIL_TO", "reader@example.com"),
            ("XKCD_MAIL_FROM", "checker@example.com"),
            ("XKCD_SMTP_SERVER", "smtp.example.com"),
            ("XKCD_SMTP_PORT", "2525"),
            ("XKCD_SMTP_TTLS", "no"),
            ("XKCD_SMTP_USERNAME", "checker"),
            ("XKCD_SMTP_PASSWORD", "hunter2"),
        ];

        let config = load(&vars).unwrap();
        assert_eq!(
            config.transport,
            Transport::Smtp(SmtpSettings {
                server: "smtp.example.com".to_string(),
                port: 2525,
                starttls: false,
                credentials: Some(SmtpCredentials {
                    username: "checker".to_string(),
                    password: "hunter2".to_string(),
                }),
            })
        );
    }

    #[test]
    fn test_smtp_defaults_without_credentials() {
        let vars = [
            ("XKCD_MAIL_METHOD", "smtp"),
            ("XKCD_MAIL_TO", "reader@example.com"),
            ("XKCD_MAIL_FROM", "checker@example.com"),
            ("XKCD_SMTP_SERVER", "localhost"),
        ];

        let Transport::Smtp(smtp) = load(&vars).unwrap().transport else {
            panic!("expected smtp transport");
        };
        assert_eq!(smtp.port, 587);
        assert!(smtp.starttls);
        assert!(smtp.credentials.is_none());
    }

    #[test]
    fn test_smtp_requires_server() {
        let vars = [
            ("XKCD_MAIL_METHOD", "smtp"),
            ("XKCD_MAIL_TO", "reader@example.com"),
            ("XKCD_MAIL_FROM", "checker@example.com"),
        ];

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("XKCD_SMTP_SERVER".to_string())
        );
    }

    #[test]
    fn test_smtp_username_without_password() {
        let vars = [
            ("XKCD_MAIL_METHOD", "smtp"),
            ("XKCD_MAIL_TO", "reader@example.com"),
            ("XKCD_MAIL_FROM", "checker@example.com"),
            ("XKCD_SMTP_SERVER", "localhost"),
            ("XKCD_SMTP_USERNAME", "checker"),
        ];

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("XKCD_SMTP_PASSWORD".to_string())
        );
    }

    #[test]
    fn test_invalid_port_and_boolean() {
        let mut vars = sendgrid_vars();
        vars.push(("XKCD_DOWNLOAD", "maybe"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));

        let vars = [
            ("XKCD_MAIL_METHOD", "smtp"),
            ("XKCD_MAIL_TO", "reader@example.com"),
            ("XKCD_MAIL_FROM", "checker@example.com"),
            ("XKCD_SMTP_SERVER", "localhost"),
            ("XKCD_SMTP_PORT", "seventy"),
        ];
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_overridable_paths() {
        let mut vars = sendgrid_vars();
        vars.push(("XKCD_API_URL", "http://127.0.0.1:9999/info.0.json"));
        vars.push(("XKCD_HISTORY_FILE", "/var/lib/xkcd/history.txt"));
        vars.push(("XKCD_COMIC_DIR", "/var/lib/xkcd/comics"));
        vars.push(("XKCD_RETRY_DELAY_SECS", "5"));

        let config = load(&vars).unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:9999/info.0.json");
        assert_eq!(config.history_file, PathBuf::from("/var/lib/xkcd/history.txt"));
        assert_eq!(config.comic_dir, PathBuf::from("/var/lib/xkcd/comics"));
        assert_eq!(config.retry_policy(), RetryPolicy::retry_once(Duration::from_secs(5)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&sendgrid_vars()).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("SG.test-key"));
        assert!(debug.contains("<redacted>"));
    }
}
