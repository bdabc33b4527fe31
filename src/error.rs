use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GrabError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("missing credential: {0}")]
    MissingCredentials(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("asset request failed: {0}")]
    AssetHttp(String),

    #[error("asset returned status {status}: {message}")]
    AssetStatus { status: u16, message: String },

    #[error("asset payload truncated: expected {expected} bytes, got {actual}")]
    AssetTruncated { expected: u64, actual: u64 },

    #[error("failed to parse checkpoint at {path}: {message}")]
    CheckpointParse { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("cancelled")]
    Cancelled,
}

impl GrabError {
    /// Errors the downloader may contain per album. Everything else aborts
    /// the whole stage.
    pub fn is_asset_transient(&self) -> bool {
        matches!(
            self,
            GrabError::AssetHttp(_)
                | GrabError::AssetStatus { .. }
                | GrabError::AssetTruncated { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(GrabError::AssetHttp("boom".to_string()).is_asset_transient());
        assert!(
            GrabError::AssetTruncated {
                expected: 10,
                actual: 3
            }
            .is_asset_transient()
        );
        assert!(!GrabError::CatalogHttp("boom".to_string()).is_asset_transient());
        assert!(!GrabError::Filesystem("disk full".to_string()).is_asset_transient());
        assert!(!GrabError::Cancelled.is_asset_transient());
    }
}
