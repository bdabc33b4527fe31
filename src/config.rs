use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::error::GrabError;
use crate::model::Username;

/// Optional run configuration (`covergrab.json`). Everything but the
/// username has a default; CLI flags override file values.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub username: Option<String>,
    #[serde(default)]
    pub playlists: Vec<String>,
    #[serde(default)]
    pub artist_checkpoint: Option<String>,
    #[serde(default)]
    pub album_checkpoint: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub username: Option<Username>,
    pub playlists: Vec<String>,
    pub artist_checkpoint: Utf8PathBuf,
    pub album_checkpoint: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub overwrite: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            username: None,
            playlists: Vec::new(),
            artist_checkpoint: default_artist_checkpoint(),
            album_checkpoint: default_album_checkpoint(),
            output_dir: default_output_dir(),
            overwrite: false,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` when given, otherwise `covergrab.json` if it exists,
    /// otherwise the defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GrabError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => {
                let fallback = PathBuf::from("covergrab.json");
                if !fallback.exists() {
                    return Ok(ResolvedConfig::default());
                }
                fallback
            }
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GrabError::ConfigRead(config_path.clone()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|err| GrabError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GrabError> {
        let username = config
            .username
            .map(|value| value.parse::<Username>())
            .transpose()?;

        Ok(ResolvedConfig {
            username,
            playlists: config.playlists,
            artist_checkpoint: config
                .artist_checkpoint
                .map(Utf8PathBuf::from)
                .unwrap_or_else(default_artist_checkpoint),
            album_checkpoint: config
                .album_checkpoint
                .map(Utf8PathBuf::from)
                .unwrap_or_else(default_album_checkpoint),
            output_dir: config
                .output_dir
                .map(Utf8PathBuf::from)
                .unwrap_or_else(default_output_dir),
            overwrite: config.overwrite.unwrap_or(false),
        })
    }
}

fn default_artist_checkpoint() -> Utf8PathBuf {
    Utf8PathBuf::from("out/artists.json")
}

fn default_album_checkpoint() -> Utf8PathBuf {
    Utf8PathBuf::from("out/albums.json")
}

fn default_output_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("out/art")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn resolve_fills_defaults() {
        let config = Config {
            username: Some("tester".to_string()),
            playlists: Vec::new(),
            artist_checkpoint: None,
            album_checkpoint: None,
            output_dir: None,
            overwrite: None,
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.username.unwrap().as_str(), "tester");
        assert_eq!(resolved.artist_checkpoint, Utf8PathBuf::from("out/artists.json"));
        assert_eq!(resolved.album_checkpoint, Utf8PathBuf::from("out/albums.json"));
        assert_eq!(resolved.output_dir, Utf8PathBuf::from("out/art"));
        assert!(!resolved.overwrite);
    }

    #[test]
    fn resolve_keeps_explicit_values() {
        let config: Config = serde_json::from_str(
            r#"{
                "username": "tester",
                "playlists": ["pl1", "pl2"],
                "album_checkpoint": "state/albums.json",
                "overwrite": true
            }"#,
        )
        .unwrap();

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.playlists, vec!["pl1", "pl2"]);
        assert_eq!(resolved.album_checkpoint, Utf8PathBuf::from("state/albums.json"));
        assert!(resolved.overwrite);
    }

    #[test]
    fn invalid_username_rejected() {
        let config: Config = serde_json::from_str(r#"{"username": "has space"}"#).unwrap();
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, GrabError::InvalidUsername(_));
    }
}
