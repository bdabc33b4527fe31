use crate::app::{CancelFlag, ProgressEvent, ProgressSink, Stage};
use crate::catalog::CatalogClient;
use crate::cursor::PageCursor;
use crate::error::GrabError;
use crate::model::{Album, AlbumMap, Artist, ArtistMap, Username};

/// Pseudo-artist the catalog attributes compilation releases to. Albums
/// whose primary artist matches it are excluded from the album map.
const VARIOUS_ARTISTS: &str = "various artists";

/// Builds the deduplicated artist map reachable from the root listing set.
///
/// Roots are the explicit `playlists` ids when non-empty, otherwise every
/// playlist owned by `user`. Each playlist's tracks are walked through a
/// [`PageCursor`]; null track slots (a known upstream anomaly) are skipped
/// without being treated as errors. The first sighting of an artist id
/// fixes its name; later sightings are ignored even if the name differs.
///
/// Any page fetch failure aborts the stage and propagates — no partial map
/// escapes.
pub fn scrape_artists<C: CatalogClient>(
    client: &C,
    user: &Username,
    playlists: &[String],
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<ArtistMap, GrabError> {
    let mut artists = ArtistMap::new();
    let mut processed = 0usize;

    if playlists.is_empty() {
        cancel.check()?;
        let first = client.user_playlists(user)?;
        for playlist in PageCursor::new(client, first) {
            let playlist = playlist?;
            collect_playlist_artists(client, &playlist.id, &mut artists, cancel)?;
            processed += 1;
            sink.event(ProgressEvent {
                stage: Stage::Artists,
                processed,
                total: None,
                label: Some(playlist.id),
            });
        }
    } else {
        for playlist_id in playlists {
            collect_playlist_artists(client, playlist_id, &mut artists, cancel)?;
            processed += 1;
            sink.event(ProgressEvent {
                stage: Stage::Artists,
                processed,
                total: Some(playlists.len()),
                label: Some(playlist_id.clone()),
            });
        }
    }

    tracing::info!(playlists = processed, artists = artists.len(), "artist extraction done");
    Ok(artists)
}

fn collect_playlist_artists<C: CatalogClient>(
    client: &C,
    playlist_id: &str,
    artists: &mut ArtistMap,
    cancel: &CancelFlag,
) -> Result<(), GrabError> {
    cancel.check()?;
    let first = client.playlist_tracks(playlist_id)?;
    for slot in PageCursor::new(client, first) {
        cancel.check()?;
        let slot = slot?;
        // removed/region-locked entries come back as "track": null
        let Some(track) = slot.track else {
            continue;
        };
        for artist in track.artists {
            artists
                .entry(artist.id)
                .or_insert(Artist { name: artist.name });
        }
    }
    Ok(())
}

/// Builds the album map for every artist in `artists`.
///
/// Dedup is global: an album reachable from two artists is recorded once,
/// under whichever artist was walked first. Albums are skipped when they
/// carry no image, when the catalog types them as a compilation, or when
/// their primary artist is the [`VARIOUS_ARTISTS`] sentinel.
pub fn scrape_albums<C: CatalogClient>(
    client: &C,
    artists: &ArtistMap,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<AlbumMap, GrabError> {
    let mut albums = AlbumMap::new();
    let total = artists.len();

    for (processed, (artist_id, artist)) in artists.iter().enumerate() {
        cancel.check()?;
        let first = client.artist_albums(artist_id)?;
        for album in PageCursor::new(client, first) {
            cancel.check()?;
            let album = album?;
            if albums.contains_key(&album.id) {
                continue;
            }
            let Some(url) = album.images.first().map(|image| image.url.clone()) else {
                continue;
            };
            if album.album_type.as_deref() == Some("compilation") {
                continue;
            }
            // first listed artist is assumed to be the main one; the rest
            // are features
            let primary = album
                .artists
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "NA".to_string());
            if primary.eq_ignore_ascii_case(VARIOUS_ARTISTS) {
                continue;
            }
            albums.insert(
                album.id,
                Album {
                    name: album.name,
                    url,
                    artist: primary,
                },
            );
        }
        sink.event(ProgressEvent {
            stage: Stage::Albums,
            processed: processed + 1,
            total: Some(total),
            label: Some(artist.name.clone()),
        });
    }

    tracing::info!(artists = total, albums = albums.len(), "album extraction done");
    Ok(albums)
}
