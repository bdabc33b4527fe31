use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GrabError;

/// Catalog account whose playlists seed the extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Username {
    type Err = GrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_graphic() && ch != '/' && ch != '?');
        if !is_valid {
            return Err(GrabError::InvalidUsername(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Artist record, keyed by artist id in [`ArtistMap`]. The name is the one
/// observed at first sight; later sightings never overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

/// Album record, keyed by album id in [`AlbumMap`]. `url` points at the
/// primary cover image; `artist` is the owning artist's display name, kept
/// for download diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    pub url: String,
    pub artist: String,
}

// BTreeMap keeps checkpoint keys ordered, so two writes of the same map are
// byte-identical.
pub type ArtistMap = BTreeMap<String, Artist>;
pub type AlbumMap = BTreeMap<String, Album>;

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_username_valid() {
        let user: Username = " lyo_6veu ".parse().unwrap();
        assert_eq!(user.as_str(), "lyo_6veu");
    }

    #[test]
    fn parse_username_invalid() {
        let err = "".parse::<Username>().unwrap_err();
        assert_matches!(err, GrabError::InvalidUsername(_));

        let err = "two words".parse::<Username>().unwrap_err();
        assert_matches!(err, GrabError::InvalidUsername(_));

        let err = "a/b".parse::<Username>().unwrap_err();
        assert_matches!(err, GrabError::InvalidUsername(_));
    }

    #[test]
    fn album_map_orders_keys() {
        let mut map = AlbumMap::new();
        for id in ["b2", "a1", "c3"] {
            map.insert(
                id.to_string(),
                Album {
                    name: id.to_string(),
                    url: format!("http://img/{id}.jpeg"),
                    artist: "x".to_string(),
                },
            );
        }
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["a1", "b2", "c3"]);
    }
}
