use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::capture_models::{ArtifactKind, FileExistence, Gravity};
use super::error::SessionError;

/// Prefix of every capture file name.
pub const PHOTO_PREFIX: &str = "IMG_";

/// Suffix of the mandatory image file. Reconciliation only looks at these.
pub const IMAGE_SUFFIX: &str = ".HEIC";

pub const DEPTH_SUFFIX: &str = "_depth.TIF";
pub const GRAVITY_SUFFIX: &str = "_gravity.TXT";

/// Minimum number of digits of the zero-padded sequence ID.
const MIN_ID_DIGITS: usize = 4;

/// On-disk identity of one capture: sequence ID plus session directory.
///
/// File layout for id 7:
/// ```text
/// IMG_0007.HEIC          image (mandatory)
/// IMG_0007_depth.TIF     depth map (optional)
/// IMG_0007_gravity.TXT   "x,y,z" gravity vector (optional)
/// ```
///
/// Existence of the files is checked on demand, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureRecord {
    id: u32,
    directory: PathBuf,
}

/// One file that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub reason: String,
}

impl CaptureRecord {
    pub fn new(id: u32, directory: impl Into<PathBuf>) -> Self {
        Self {
            id,
            directory: directory.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `IMG_NNNN` stem shared by all three files.
    pub fn photo_id_string(&self) -> String {
        photo_id_string(self.id)
    }

    pub fn image_path(&self) -> PathBuf {
        image_path(&self.directory, self.id)
    }

    pub fn depth_path(&self) -> PathBuf {
        depth_path(&self.directory, self.id)
    }

    pub fn gravity_path(&self) -> PathBuf {
        gravity_path(&self.directory, self.id)
    }

    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Image => self.image_path(),
            ArtifactKind::Depth => self.depth_path(),
            ArtifactKind::Gravity => self.gravity_path(),
        }
    }

    /// Check which of the three files currently exist.
    ///
    /// Blocking; run it off the UI thread.
    pub fn check_files_exist(&self) -> Result<FileExistence, SessionError> {
        if !self.directory.is_dir() {
            return Err(SessionError::directory_unavailable(
                &self.directory,
                "not a directory",
            ));
        }

        Ok(FileExistence {
            image: self.image_path().is_file(),
            depth: self.depth_path().is_file(),
            gravity: self.gravity_path().is_file(),
        })
    }

    /// Read back the gravity sidecar, `None` if there is none.
    pub fn read_gravity(&self) -> Result<Option<Gravity>, SessionError> {
        let path = self.gravity_path();
        match fs::read_to_string(&path) {
            Ok(text) => text.parse().map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::directory_unavailable(path, e)),
        }
    }

    /// Delete image, depth and gravity files independently.
    ///
    /// A missing file is not a failure. Returns the deletions that did fail.
    pub fn delete_all_files(&self) -> Vec<DeletionFailure> {
        [ArtifactKind::Image, ArtifactKind::Depth, ArtifactKind::Gravity]
            .into_iter()
            .filter_map(|kind| {
                let path = self.path_for(kind);
                match fs::remove_file(&path) {
                    Ok(()) => None,
                    Err(e) if e.kind() == ErrorKind::NotFound => None,
                    Err(e) => Some(DeletionFailure {
                        kind,
                        path,
                        reason: e.to_string(),
                    }),
                }
            })
            .collect()
    }
}

/// Render the `IMG_NNNN` stem for a sequence ID.
pub fn photo_id_string(id: u32) -> String {
    format!("{}{:04}", PHOTO_PREFIX, id)
}

pub fn image_path(directory: &Path, id: u32) -> PathBuf {
    directory.join(format!("{}{}", photo_id_string(id), IMAGE_SUFFIX))
}

pub fn depth_path(directory: &Path, id: u32) -> PathBuf {
    directory.join(format!("{}{}", photo_id_string(id), DEPTH_SUFFIX))
}

pub fn gravity_path(directory: &Path, id: u32) -> PathBuf {
    directory.join(format!("{}{}", photo_id_string(id), GRAVITY_SUFFIX))
}

/// Parse the sequence ID out of an image file name such as `IMG_0042.HEIC`.
///
/// The name must be exactly `IMG_` + the id rendered with at least four
/// digits + `.HEIC`. Other paddings of the same id are rejected, since the
/// record's derived paths would not point at them.
pub fn extract_id(file_name: &str) -> Result<u32, SessionError> {
    let stem = file_name
        .strip_suffix(IMAGE_SUFFIX)
        .ok_or_else(|| SessionError::ParseFailed(format!("{:?} is not an image file", file_name)))?;

    let digits = stem
        .strip_prefix(PHOTO_PREFIX)
        .ok_or_else(|| SessionError::ParseFailed(format!("{:?} lacks the {} prefix", file_name, PHOTO_PREFIX)))?;

    if digits.len() < MIN_ID_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SessionError::ParseFailed(format!(
            "{:?} has no zero-padded numeric id",
            file_name
        )));
    }

    let id: u32 = digits
        .parse()
        .map_err(|e| SessionError::ParseFailed(format!("{:?}: {}", file_name, e)))?;

    if photo_id_string(id) != stem {
        return Err(SessionError::ParseFailed(format!(
            "{:?} is not the canonical name of capture {}",
            file_name, id
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_naming_scheme() {
        let record = CaptureRecord::new(7, "/captures/session");
        assert_eq!(record.photo_id_string(), "IMG_0007");
        assert_eq!(record.image_path(), PathBuf::from("/captures/session/IMG_0007.HEIC"));
        assert_eq!(record.depth_path(), PathBuf::from("/captures/session/IMG_0007_depth.TIF"));
        assert_eq!(
            record.gravity_path(),
            PathBuf::from("/captures/session/IMG_0007_gravity.TXT")
        );
    }

    #[test]
    fn ids_wider_than_four_digits_are_not_truncated() {
        assert_eq!(photo_id_string(12345), "IMG_12345");
        assert_eq!(extract_id("IMG_12345.HEIC").unwrap(), 12345);
    }

    #[test]
    fn extract_id_parses_valid_names() {
        assert_eq!(extract_id("IMG_0042.HEIC").unwrap(), 42);
        assert_eq!(extract_id("IMG_0000.HEIC").unwrap(), 0);
    }

    #[test]
    fn extract_id_rejects_malformed_names() {
        for name in [
            "foo.HEIC",
            "IMG_abc.HEIC",
            "IMG_42.HEIC",
            "IMG_+042.HEIC",
            "IMG_0042.heic",
            "IMG_0042_depth.TIF",
            "XIMG_0042.HEIC",
            "IMG_99999999999.HEIC",
            "IMG_00042.HEIC",
            "IMG_012345.HEIC",
        ] {
            assert!(
                matches!(extract_id(name), Err(SessionError::ParseFailed(_))),
                "{} should not parse",
                name
            );
        }
    }

    #[test]
    fn check_files_exist_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let record = CaptureRecord::new(3, dir.path());

        assert_eq!(record.check_files_exist().unwrap(), FileExistence::default());

        fs::write(record.image_path(), b"img").unwrap();
        fs::write(record.gravity_path(), "0.000000,-1.000000,0.000000").unwrap();

        let existence = record.check_files_exist().unwrap();
        assert!(existence.image);
        assert!(!existence.depth);
        assert!(existence.gravity);
    }

    #[test]
    fn check_files_exist_fails_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let record = CaptureRecord::new(1, dir.path().join("gone"));
        assert!(matches!(
            record.check_files_exist(),
            Err(SessionError::DirectoryUnavailable { .. })
        ));
    }

    #[test]
    fn read_gravity_handles_missing_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let record = CaptureRecord::new(1, dir.path());
        assert_eq!(record.read_gravity().unwrap(), None);

        fs::write(record.gravity_path(), "0.100000,0.200000,0.300000").unwrap();
        assert_eq!(record.read_gravity().unwrap(), Some(Gravity::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn delete_all_files_tolerates_missing_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let record = CaptureRecord::new(9, dir.path());
        fs::write(record.image_path(), b"img").unwrap();

        let failures = record.delete_all_files();
        assert!(failures.is_empty());
        assert!(!record.image_path().exists());
    }
}
