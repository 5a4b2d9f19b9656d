use std::path::Path;

use askama::Template;

use crate::config::Config;
use crate::error::NotifyError;
use crate::scraper::xkcd::ComicRecord;

const PROJECT_URL: &str = "https://github.com/bryanhiestand/xkcd_checker";

#[derive(Template)]
#[template(path = "email/comic.html")]
struct ComicHtml<'a> {
    title: &'a str,
    img: &'a str,
    alt: Option<&'a str>,
    project_url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// A fully composed notification, independent of the transport
#[derive(Debug, Clone)]
pub struct ComicEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachment: Option<Attachment>,
}

impl ComicEmail {
    pub fn compose(comic: &ComicRecord, config: &Config) -> Result<Self, NotifyError> {
        let subject = format!(
            "New xkcd {}: {} from {}",
            comic.num,
            comic.title,
            comic.date_string()
        );

        let mut text = format!("{}: {}", comic.title, comic.img);
        if let Some(alt) = &comic.alt {
            text.push('\n');
            text.push_str(alt);
        }

        let html = ComicHtml {
            title: &comic.title,
            img: &comic.img,
            alt: comic.alt.as_deref(),
            project_url: PROJECT_URL,
        }
        .render()
        .map_err(|e| NotifyError::Message(e.to_string()))?;

        Ok(Self {
            from: config.mail_from.clone(),
            to: config.mail_to.clone(),
            subject,
            text,
            html,
            attachment: None,
        })
    }

    /// Attach the downloaded comic at `path`
    pub async fn attach_file(&mut self, path: &Path) -> Result<(), NotifyError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| NotifyError::Attachment {
                path: path.to_path_buf(),
                source,
            })?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.attachment = Some(Attachment {
            content_type: image_content_type(&filename),
            filename,
            data,
        });
        Ok(())
    }
}

/// MIME type guessed from the file extension
pub fn image_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
