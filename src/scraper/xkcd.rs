//! Client for the xkcd JSON API
//!
//! The API serves the latest comic at `https://xkcd.com/info.0.json`. Only
//! the fields needed for a notification are kept.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::error::FetchError;

/// The latest comic as published upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicRecord {
    pub num: u64,
    pub title: String,
    pub img: String,
    pub alt: Option<String>,
    pub published: NaiveDate,
}

impl ComicRecord {
    /// Publish date as `Fri 05 Mar 21`
    pub fn date_string(&self) -> String {
        self.published.format("%a %d %b %y").to_string()
    }
}

/// Raw shape of `info.0.json`. Date parts arrive as strings.
#[derive(Debug, Deserialize)]
struct ApiComic {
    num: u64,
    title: String,
    #[serde(default)]
    safe_title: Option<String>,
    img: String,
    #[serde(default)]
    alt: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    year: i32,
    #[serde(deserialize_with = "number_or_string")]
    month: u32,
    #[serde(deserialize_with = "number_or_string")]
    day: u32,
}

fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + TryFrom<i64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => {
            T::try_from(n).map_err(|_| serde::de::Error::custom(format!("{} out of range", n)))
        }
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", s))),
    }
}

/// Parse the API body into a `ComicRecord`
pub fn parse_comic_json(body: &str) -> Result<ComicRecord, String> {
    let raw: ApiComic = serde_json::from_str(body).map_err(|e| e.to_string())?;

    if raw.num == 0 {
        return Err("comic number must be positive".to_string());
    }

    let published = NaiveDate::from_ymd_opt(raw.year, raw.month, raw.day).ok_or_else(|| {
        format!(
            "invalid publish date {}-{}-{}",
            raw.year, raw.month, raw.day
        )
    })?;

    let title = raw
        .safe_title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(raw.title);

    Ok(ComicRecord {
        num: raw.num,
        title,
        img: raw.img,
        alt: raw.alt.filter(|a| !a.trim().is_empty()),
        published,
    })
}

/// How many times to try the fetch and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn retry_once(delay: Duration) -> Self {
        Self { attempts: 2, delay }
    }
}

/// Fetch the latest comic with a single attempt
pub async fn fetch_latest_comic(url: &str) -> Result<ComicRecord, FetchError> {
    tracing::debug!("Fetching xkcd json: {}", url);

    let response = super::http_client()
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;

    let comic = parse_comic_json(&body).map_err(|reason| FetchError::Parse {
        url: url.to_string(),
        reason,
    })?;

    tracing::debug!(
        num = comic.num,
        title = %comic.title,
        img = %comic.img,
        published = %comic.published,
        "Got xkcd json"
    );

    Ok(comic)
}

/// Fetch the latest comic, retrying after a fixed delay
///
/// Returns the last error once `policy.attempts` have been used up.
pub async fn fetch_with_retry(url: &str, policy: RetryPolicy) -> Result<ComicRecord, FetchError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match fetch_latest_comic(url).await {
            Ok(comic) => return Ok(comic),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    error = %e,
                    "Unable to download json, sleeping {:?} before retrying",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts, error = %e, "Still unable to download json, giving up");
                return Err(e);
            }
        }
    }
}
