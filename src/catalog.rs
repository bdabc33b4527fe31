use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::GrabError;
use crate::model::Username;

/// How long an access token is trusted before the next access re-acquires
/// it. Checked lazily on each request, never by a background timer.
const TOKEN_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// One page of a cursor-paginated listing. `next` is an opaque full-URL
/// cursor; absent or null means the sequence ends.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
}

/// A playlist track slot. The upstream API is known to return
/// `"track": null` for removed or region-locked entries; the slot survives
/// deserialization so the extractor can decide what to do with it.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackSlot {
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

/// Session seam over the remote catalog. Implementations own credential
/// handling and any retry policy; callers just see typed pages.
pub trait CatalogClient: Send + Sync {
    fn user_playlists(&self, user: &Username) -> Result<Page<PlaylistSummary>, GrabError>;
    fn playlist_tracks(&self, playlist_id: &str) -> Result<Page<TrackSlot>, GrabError>;
    fn artist_albums(&self, artist_id: &str) -> Result<Page<AlbumSummary>, GrabError>;
    /// Follow a page's `next` cursor. Cursor URLs are single-use and only
    /// valid for the listing they came from.
    fn next_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>, GrabError>;
}

#[derive(Debug)]
struct TokenState {
    access_token: Option<String>,
    refreshed_at: Option<Instant>,
}

pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<TokenState>,
}

impl HttpCatalogClient {
    /// Reads `COVERGRAB_CLIENT_ID` / `COVERGRAB_CLIENT_SECRET` from the
    /// environment. Missing credentials are fatal up front rather than on
    /// the first request.
    pub fn new() -> Result<Self, GrabError> {
        let client_id = require_env("COVERGRAB_CLIENT_ID")?;
        let client_secret = require_env("COVERGRAB_CLIENT_SECRET")?;
        Self::with_endpoints(
            "https://api.spotify.com/v1".to_string(),
            "https://accounts.spotify.com/api/token".to_string(),
            client_id,
            client_secret,
        )
    }

    pub fn with_endpoints(
        base_url: String,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Result<Self, GrabError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("covergrab/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GrabError::CatalogHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GrabError::CatalogHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token_url,
            client_id,
            client_secret,
            token: Mutex::new(TokenState {
                access_token: None,
                refreshed_at: None,
            }),
        })
    }

    /// Returns a bearer token, re-acquiring it when more than
    /// [`TOKEN_REFRESH_INTERVAL`] has passed since the last refresh.
    fn bearer(&self) -> Result<String, GrabError> {
        let mut state = self
            .token
            .lock()
            .map_err(|_| GrabError::Auth("token state poisoned".to_string()))?;

        let stale = match (&state.access_token, state.refreshed_at) {
            (Some(_), Some(at)) => at.elapsed() > TOKEN_REFRESH_INTERVAL,
            _ => true,
        };
        if stale {
            tracing::debug!("acquiring catalog access token");
            let token = self.request_token()?;
            state.access_token = Some(token);
            state.refreshed_at = Some(Instant::now());
        }

        state
            .access_token
            .clone()
            .ok_or_else(|| GrabError::Auth("no access token".to_string()))
    }

    fn request_token(&self) -> Result<String, GrabError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|err| GrabError::Auth(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "token request failed".to_string());
            return Err(GrabError::Auth(format!("status {}: {message}", status.as_u16())));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|err| GrabError::Auth(err.to_string()))?;
        Ok(token.access_token)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GrabError> {
        let token = self.bearer()?;
        let response = self.send_with_retries(|| self.client.get(url).bearer_auth(&token))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(GrabError::CatalogStatus {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .map_err(|err| GrabError::CatalogHttp(err.to_string()))
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<reqwest::blocking::Response, GrabError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(GrabError::CatalogHttp(err.to_string()));
                }
            }
        }
    }
}

impl CatalogClient for HttpCatalogClient {
    fn user_playlists(&self, user: &Username) -> Result<Page<PlaylistSummary>, GrabError> {
        let url = format!("{}/users/{}/playlists", self.base_url, user.as_str());
        self.get_json(&url)
    }

    fn playlist_tracks(&self, playlist_id: &str) -> Result<Page<TrackSlot>, GrabError> {
        let url = format!("{}/playlists/{playlist_id}/tracks", self.base_url);
        self.get_json(&url)
    }

    fn artist_albums(&self, artist_id: &str) -> Result<Page<AlbumSummary>, GrabError> {
        let url = format!("{}/artists/{artist_id}/albums", self.base_url);
        self.get_json(&url)
    }

    fn next_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>, GrabError> {
        self.get_json(url)
    }
}

fn require_env(name: &str) -> Result<String, GrabError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(GrabError::MissingCredentials(name.to_string())),
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_deserializes_null_next() {
        let page: Page<PlaylistSummary> =
            serde_json::from_str(r#"{"items":[{"id":"p1"}],"next":null}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn page_deserializes_missing_next() {
        let page: Page<PlaylistSummary> = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn track_slot_keeps_null_payload() {
        let page: Page<TrackSlot> = serde_json::from_str(
            r#"{"items":[{"track":null},{"track":{"artists":[{"id":"a1","name":"Artist"}]}}],"next":null}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].track.is_none());
        assert_eq!(page.items[1].track.as_ref().unwrap().artists[0].id, "a1");
    }

    #[test]
    fn album_summary_tolerates_sparse_payloads() {
        let album: AlbumSummary = serde_json::from_str(r#"{"id":"X2","images":[]}"#).unwrap();
        assert_eq!(album.id, "X2");
        assert!(album.images.is_empty());
        assert!(album.album_type.is_none());
        assert!(album.artists.is_empty());
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(401));
    }
}
