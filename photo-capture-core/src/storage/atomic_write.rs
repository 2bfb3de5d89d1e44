use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::error::SessionError;

/// Write `data` to `path` so that the final name only ever shows a complete file.
///
/// The bytes go to a hidden staging file in the same directory, which is
/// synced and then renamed over `path`. On any failure the staging file is
/// removed and `path` is left untouched.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), SessionError> {
    let staging = staging_path(path)?;

    if let Err(e) = write_and_sync(&staging, data) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    fs::rename(&staging, path).map_err(|e| {
        let _ = fs::remove_file(&staging);
        SessionError::persistence_failed(path, format!("rename failed: {}", e))
    })
}

fn write_and_sync(staging: &Path, data: &[u8]) -> Result<(), SessionError> {
    let mut file = File::create(staging)
        .map_err(|e| SessionError::persistence_failed(staging, format!("failed to create file: {}", e)))?;
    file.write_all(data)
        .map_err(|e| SessionError::persistence_failed(staging, format!("write failed: {}", e)))?;
    file.sync_all()
        .map_err(|e| SessionError::persistence_failed(staging, format!("sync failed: {}", e)))?;
    Ok(())
}

/// `.<name>.<uuid>.tmp` next to the target, invisible to reconciliation.
fn staging_path(path: &Path) -> Result<PathBuf, SessionError> {
    let name = path
        .file_name()
        .ok_or_else(|| SessionError::persistence_failed(path, "path has no file name"))?;
    let staging_name = format!(".{}.{}.tmp", name.to_string_lossy(), uuid::Uuid::new_v4().simple());
    Ok(path.with_file_name(staging_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_complete_file_and_leaves_no_staging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_0001.HEIC");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn fails_when_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("IMG_0001.HEIC");

        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, SessionError::PersistenceFailed { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn staging_name_is_hidden_and_unique() {
        let path = Path::new("/tmp/session/IMG_0002.HEIC");
        let a = staging_path(path).unwrap();
        let b = staging_path(path).unwrap();

        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".IMG_0002.HEIC."));
        assert!(name.ends_with(".tmp"));
    }
}
