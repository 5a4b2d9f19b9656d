//! Mails the latest xkcd comic to a single recipient, once per comic.
//!
//! Meant to be run periodically (cron, systemd timer). Each invocation is a
//! complete check; state between runs lives in the history file and the
//! comic directory.

mod checker;
mod config;
mod db;
mod error;
mod notify;
mod scraper;

use std::process::ExitCode;

use checker::{Checker, RunOutcome};
use config::Config;
use error::CheckerError;

async fn check_once() -> Result<RunOutcome, CheckerError> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded configuration");
    tracing::info!(method = %config.method(), "Checking {}", config.api_url);

    Checker::new(config)?.run().await
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xkcd_checker=info".into()),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match check_once().await {
        Ok(RunOutcome::AlreadyNotified(num)) => {
            tracing::info!("xkcd {} already mailed, nothing to do", num);
            Ok(ExitCode::SUCCESS)
        }
        Ok(RunOutcome::Notified(num)) => {
            tracing::info!("xkcd {} mailed", num);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(exit_code = e.exit_code(), "{}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
