//! One complete check: fetch, compare with history, download, mail, record
//!
//! The identifier is written to the history only after the transport accepts
//! the message, so any failure leaves it to be retried by the next run.

use crate::config::Config;
use crate::db::HistoryLog;
use crate::error::CheckerError;
use crate::notify::{ComicEmail, Mailer, SendOutcome};
use crate::scraper::downloader::download_comic;
use crate::scraper::xkcd::fetch_with_retry;

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The latest comic was already in the history; nothing was done
    AlreadyNotified(u64),
    /// The latest comic was mailed and recorded
    Notified(u64),
}

pub struct Checker {
    config: Config,
    history: HistoryLog,
    mailer: Mailer,
}

impl Checker {
    pub fn new(config: Config) -> Result<Self, CheckerError> {
        let mailer = Mailer::from_transport(&config.transport)?;
        Ok(Self::with_mailer(config, mailer))
    }

    pub fn with_mailer(config: Config, mailer: Mailer) -> Self {
        let history = HistoryLog::new(config.history_file.clone());
        Self {
            config,
            history,
            mailer,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome, CheckerError> {
        let comic = fetch_with_retry(&self.config.api_url, self.config.retry_policy()).await?;

        if self.history.contains(comic.num)? {
            return Ok(RunOutcome::AlreadyNotified(comic.num));
        }

        tracing::info!(num = comic.num, title = %comic.title, "New comic found");

        // Otherwise every run would re-download and re-mail
        self.history.ensure_writable()?;

        let filename = download_comic(&comic, &self.config.comic_dir, self.config.download).await?;

        let mut email = ComicEmail::compose(&comic, &self.config)?;
        if self.config.mail_attachment {
            email
                .attach_file(&self.config.comic_dir.join(&filename))
                .await?;
        }

        match self.mailer.send(&email).await? {
            SendOutcome::Accepted => {}
            SendOutcome::Rejected { code, detail } => {
                let code = code.map_or_else(|| "no status".to_string(), |c| c.to_string());
                return Err(CheckerError::NotifySend(format!("{} ({})", detail, code)));
            }
        }

        self.history.append(comic.num)?;
        tracing::info!(
            num = comic.num,
            "Mailed xkcd {}, recorded in {}",
            comic.num,
            self.history.path().display()
        );

        Ok(RunOutcome::Notified(comic.num))
    }
}
