use std::path::{Path, PathBuf};

use super::xkcd::ComicRecord;
use crate::error::DownloadError;

/// `<num>-<basename of the image url>`, e.g. `999-pic.png`
pub fn local_filename(comic: &ComicRecord) -> String {
    format!("{}-{}", comic.num, url_basename(&comic.img))
}

fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Save the comic image under `comic_dir`
///
/// When downloads are disabled nothing is fetched, but the filename the image
/// would have had is still returned so attachment logic can refer to it.
pub async fn download_comic(
    comic: &ComicRecord,
    comic_dir: &Path,
    enabled: bool,
) -> Result<String, DownloadError> {
    let filename = local_filename(comic);

    if !enabled {
        tracing::info!("Downloads disabled, skipping...");
        return Ok(filename);
    }

    tokio::fs::create_dir_all(comic_dir)
        .await
        .map_err(|source| DownloadError::CreateDir {
            path: comic_dir.to_path_buf(),
            source,
        })?;

    let response = super::http_client()
        .get(&comic.img)
        .send()
        .await
        .map_err(|source| DownloadError::Request {
            url: comic.img.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: comic.img.clone(),
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| DownloadError::Request {
            url: comic.img.clone(),
            source,
        })?;

    let path: PathBuf = comic_dir.join(&filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| DownloadError::Write {
            path: path.clone(),
            source,
        })?;

    tracing::info!(bytes = bytes.len(), "Downloaded latest comic {}", filename);

    Ok(filename)
}
