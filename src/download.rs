use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use serde::Serialize;

use crate::app::{CancelFlag, ProgressEvent, ProgressSink, Stage};
use crate::error::GrabError;
use crate::fs_util;
use crate::model::AlbumMap;

/// Fetch seam for cover images. No retry policy here: a failed asset is
/// reported once and the batch moves on.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, GrabError>;
}

pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Result<Self, GrabError> {
        let client = Client::builder()
            .user_agent(format!("covergrab/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GrabError::AssetHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, GrabError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| GrabError::AssetHttp(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "asset request failed".to_string());
            return Err(GrabError::AssetStatus {
                status: status.as_u16(),
                message,
            });
        }

        let declared = response.content_length();
        let body = response
            .bytes()
            .map_err(|err| GrabError::AssetHttp(err.to_string()))?;
        if let Some(expected) = declared {
            let actual = body.len() as u64;
            if actual < expected {
                return Err(GrabError::AssetTruncated { expected, actual });
            }
        }
        Ok(body.to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadOptions {
    /// Re-fetch and replace files that already exist. Off by default: an
    /// existing file is the marker that the album is already done.
    pub overwrite: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAsset {
    pub album_id: String,
    pub name: String,
    pub artist: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadReport {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: Vec<FailedAsset>,
}

impl DownloadReport {
    pub fn processed(&self) -> usize {
        self.fetched + self.skipped + self.failed.len()
    }
}

/// Local file for an album's cover image. The file's existence doubles as
/// the already-downloaded marker, so the naming has to stay deterministic.
pub fn asset_path(out_dir: &Utf8Path, album_id: &str) -> Utf8PathBuf {
    out_dir.join(format!("{album_id}.jpeg"))
}

/// Downloads one cover image per album into `out_dir`, in map order.
///
/// Idempotent: albums whose file already exists are skipped (unless
/// `options.overwrite`), so re-running a finished batch costs no network
/// traffic. Transient fetch errors are contained per album and recorded in
/// the report; filesystem errors and cancellation abort the batch. Absent
/// cancellation, `report.processed()` equals the map size.
pub fn download_all<F: AssetFetcher>(
    fetcher: &F,
    albums: &AlbumMap,
    out_dir: &Utf8Path,
    options: DownloadOptions,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<DownloadReport, GrabError> {
    fs_util::ensure_dir(out_dir)?;

    let total = albums.len();
    let mut report = DownloadReport::default();

    for (album_id, album) in albums {
        cancel.check()?;
        let path = asset_path(out_dir, album_id);

        if !options.overwrite && path.as_std_path().exists() {
            report.skipped += 1;
        } else {
            match fetcher.fetch(&album.url) {
                Ok(bytes) => {
                    fs_util::write_bytes_atomic(&path, &bytes)?;
                    report.fetched += 1;
                }
                Err(err) if err.is_asset_transient() => {
                    tracing::warn!(
                        album = %album.name,
                        artist = %album.artist,
                        error = %err,
                        "could not retrieve cover"
                    );
                    report.failed.push(FailedAsset {
                        album_id: album_id.clone(),
                        name: album.name.clone(),
                        artist: album.artist.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        sink.event(ProgressEvent {
            stage: Stage::Download,
            processed: report.processed(),
            total: Some(total),
            label: Some(album.name.clone()),
        });
    }

    tracing::info!(
        fetched = report.fetched,
        skipped = report.skipped,
        failed = report.failed.len(),
        "download batch done"
    );
    Ok(report)
}
