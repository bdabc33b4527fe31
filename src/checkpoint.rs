use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::GrabError;
use crate::fs_util;

/// Returns the map stored at `path` if one exists (and `refresh` is false),
/// otherwise runs `produce` and persists its result as a single full
/// snapshot.
///
/// A checkpoint file is all-or-nothing: the producer's map is serialized in
/// one atomic write, and a producer failure (including cancellation) writes
/// nothing at all. When the checkpoint is read back the producer never
/// runs, so a warm re-run costs zero network traffic.
pub fn load_or_compute<T, F>(
    path: &Utf8Path,
    refresh: bool,
    produce: F,
) -> Result<BTreeMap<String, T>, GrabError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<BTreeMap<String, T>, GrabError>,
{
    if !refresh && path.as_std_path().exists() {
        tracing::debug!(%path, "loading checkpoint");
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| GrabError::Filesystem(err.to_string()))?;
        return serde_json::from_str(&content).map_err(|err| GrabError::CheckpointParse {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        });
    }

    let map = produce()?;

    let content =
        serde_json::to_vec_pretty(&map).map_err(|err| GrabError::Filesystem(err.to_string()))?;
    fs_util::write_bytes_atomic(path, &content)?;
    tracing::debug!(%path, entries = map.len(), "checkpoint written");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use crate::model::{Artist, ArtistMap};

    use super::*;

    fn checkpoint_path(temp: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().join("state").join("artists.json")).unwrap()
    }

    fn sample_map() -> ArtistMap {
        let mut map = ArtistMap::new();
        map.insert(
            "a1".to_string(),
            Artist {
                name: "One".to_string(),
            },
        );
        map
    }

    #[test]
    fn producer_runs_at_most_once_across_two_calls() {
        let temp = tempfile::tempdir().unwrap();
        let path = checkpoint_path(&temp);
        let runs = Cell::new(0usize);

        let produce = || {
            runs.set(runs.get() + 1);
            Ok(sample_map())
        };
        let first = load_or_compute(&path, false, produce).unwrap();

        let second = load_or_compute::<Artist, _>(&path, false, || {
            runs.set(runs.get() + 1);
            Ok(ArtistMap::new())
        })
        .unwrap();

        assert_eq!(runs.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn second_read_is_byte_identical() {
        let temp = tempfile::tempdir().unwrap();
        let path = checkpoint_path(&temp);

        load_or_compute(&path, false, || Ok(sample_map())).unwrap();
        let bytes_a = fs::read(path.as_std_path()).unwrap();
        load_or_compute::<Artist, _>(&path, false, || unreachable!("checkpoint exists")).unwrap();
        let bytes_b = fs::read(path.as_std_path()).unwrap();

        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn refresh_reinvokes_producer_and_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let path = checkpoint_path(&temp);

        load_or_compute(&path, false, || Ok(sample_map())).unwrap();

        let mut replacement = ArtistMap::new();
        replacement.insert(
            "a2".to_string(),
            Artist {
                name: "Two".to_string(),
            },
        );
        let map = load_or_compute(&path, true, || Ok(replacement.clone())).unwrap();
        assert_eq!(map, replacement);

        let reread = load_or_compute::<Artist, _>(&path, false, || unreachable!()).unwrap();
        assert_eq!(reread, replacement);
    }

    #[test]
    fn producer_failure_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let path = checkpoint_path(&temp);

        let err = load_or_compute::<Artist, _>(&path, false, || Err(GrabError::Cancelled))
            .unwrap_err();
        assert_matches!(err, GrabError::Cancelled);
        assert!(!path.as_std_path().exists());
    }

    #[test]
    fn corrupt_checkpoint_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let path = checkpoint_path(&temp);
        fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
        fs::write(path.as_std_path(), b"{ not json").unwrap();

        let err =
            load_or_compute::<Artist, _>(&path, false, || Ok(ArtistMap::new())).unwrap_err();
        assert_matches!(err, GrabError::CheckpointParse { .. });
    }
}
