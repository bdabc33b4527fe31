use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::catalog::CatalogClient;
use crate::checkpoint;
use crate::download::{self, AssetFetcher, DownloadOptions, DownloadReport};
use crate::error::GrabError;
use crate::extract;
use crate::model::Username;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Artists,
    Albums,
    Download,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Artists => write!(f, "artists"),
            Stage::Albums => write!(f, "albums"),
            Stage::Download => write!(f, "download"),
        }
    }
}

/// One unit of progress: how far a stage has come and what it is looking at
/// right now. `total` is unknown while a stage is still discovering work.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub processed: usize,
    pub total: Option<usize>,
    pub label: Option<String>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Sink that drops every event. Useful for tests and non-interactive runs.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn event(&self, _event: ProgressEvent) {}
}

/// Cooperative cancellation handle. Raising it stops the pipeline before
/// the next network fetch; checkpoints and asset files already on disk are
/// left intact, and the stage that was cancelled writes no checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), GrabError> {
        if self.is_cancelled() {
            return Err(GrabError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub username: Username,
    /// Explicit playlist roots; empty means "all playlists of `username`".
    pub playlists: Vec<String>,
    pub artist_checkpoint: Utf8PathBuf,
    pub album_checkpoint: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    /// Ignore existing checkpoints and re-extract both stages.
    pub refresh: bool,
    /// Re-fetch asset files that already exist.
    pub overwrite: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub artists: usize,
    pub albums: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: Vec<download::FailedAsset>,
}

pub struct App<C: CatalogClient, F: AssetFetcher> {
    catalog: C,
    fetcher: F,
}

impl<C: CatalogClient, F: AssetFetcher> App<C, F> {
    pub fn new(catalog: C, fetcher: F) -> Self {
        Self { catalog, fetcher }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs the whole pipeline: artist checkpoint, album checkpoint, then
    /// the cover download batch. Each extraction stage is skipped entirely
    /// when its checkpoint already exists and `refresh` is off.
    pub fn run(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<RunResult, GrabError> {
        let artists = checkpoint::load_or_compute(&options.artist_checkpoint, options.refresh, || {
            extract::scrape_artists(
                &self.catalog,
                &options.username,
                &options.playlists,
                sink,
                cancel,
            )
        })?;

        let albums = checkpoint::load_or_compute(&options.album_checkpoint, options.refresh, || {
            extract::scrape_albums(&self.catalog, &artists, sink, cancel)
        })?;

        let report: DownloadReport = download::download_all(
            &self.fetcher,
            &albums,
            &options.output_dir,
            DownloadOptions {
                overwrite: options.overwrite,
            },
            sink,
            cancel,
        )?;

        Ok(RunResult {
            artists: artists.len(),
            albums: albums.len(),
            fetched: report.fetched,
            skipped: report.skipped,
            failed: report.failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_propagates_to_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
        assert!(other.check().is_err());
    }
}
