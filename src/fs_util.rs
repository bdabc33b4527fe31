use std::fs;
use std::io::Write;

use camino::Utf8Path;

use crate::error::GrabError;

/// Creates a directory and its parents. Already-existing directories are
/// not an error.
pub fn ensure_dir(path: &Utf8Path) -> Result<(), GrabError> {
    fs::create_dir_all(path.as_std_path()).map_err(|err| GrabError::Filesystem(err.to_string()))
}

/// Writes `content` to a tempfile in the destination's parent directory and
/// renames it into place, so a crash mid-write never leaves a half-written
/// file at `path`. Missing parent directories are created first.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), GrabError> {
    let parent = path
        .parent()
        .ok_or_else(|| GrabError::Filesystem("destination has no parent directory".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| GrabError::Filesystem(err.to_string()))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".covergrab")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| GrabError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| GrabError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| GrabError::Filesystem(err.to_string()))?;
    Ok(())
}
