//! File download
//!
//! Files carry a short-lived, pre-authenticated download reference; the body is
//! streamed to `<name>.part` in the download directory and renamed into place
//! once complete.

use crate::error::DriveError;
use crate::model::Entry;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub struct Downloader {
    http: reqwest::Client,
    directory: PathBuf,
}

impl Downloader {
    /// Only the connect phase is bounded; large bodies may take arbitrarily long
    pub fn new(directory: PathBuf, connect_timeout: Duration) -> Result<Self, DriveError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DriveError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Where `entry` would be written
    pub fn target_path(&self, entry: &Entry) -> PathBuf {
        self.directory.join(sanitize_file_name(&entry.name))
    }

    pub async fn download(&self, entry: &Entry) -> Result<PathBuf, DriveError> {
        let url = download_url(entry)?;
        tokio::fs::create_dir_all(&self.directory).await?;

        let target = self.target_path(entry);
        let partial = partial_path(&target);
        debug!(item_id = %entry.id, target = %target.display(), "Starting download");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DriveError::Api {
                status: status.as_u16(),
                message: format!("Download of {} failed", entry.name),
            });
        }

        let written = match stream_into_place(resp, &partial, &target).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        info!(item_id = %entry.id, bytes = written, target = %target.display(), "Download complete");
        Ok(target)
    }
}

/// Write the body to `partial`, then rename it to `target`
async fn stream_into_place(
    resp: reqwest::Response,
    partial: &Path,
    target: &Path,
) -> Result<u64, DriveError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);
    tokio::fs::rename(partial, target).await?;
    Ok(written)
}

fn download_url(entry: &Entry) -> Result<&str, DriveError> {
    if entry.is_folder() {
        return Err(DriveError::InvalidOperation(format!(
            "{} is a folder; only files can be downloaded",
            entry.name
        )));
    }
    entry.download_url().ok_or_else(|| {
        DriveError::InvalidOperation(format!("{} has no download URL", entry.name))
    })
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Make a remote display name safe to use as a local file name
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "download".to_string()
    } else {
        cleaned
    }
}
