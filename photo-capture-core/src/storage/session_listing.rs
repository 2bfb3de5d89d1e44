use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, TimeZone};

use crate::models::error::SessionError;
use crate::processing::completion::Completion;
use crate::processing::work_queue::WorkQueue;

/// Medium date + medium time in the POSIX locale, e.g. `Oct 19, 2026 at 4:05:09 PM`.
const SESSION_NAME_FORMAT: &str = "%b %-d, %Y at %-I:%M:%S %p";

/// Folder name for a session started at `at`.
pub fn session_directory_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(SESSION_NAME_FORMAT).to_string()
}

/// Create a new, timestamp-named session folder under `captures_root`.
///
/// Intermediate directories are created as needed. An existing folder with
/// the same name is reused.
pub fn create_session_directory(captures_root: &Path) -> Result<PathBuf, SessionError> {
    let path = captures_root.join(session_directory_name(&Local::now()));

    fs::create_dir_all(&path).map_err(|e| {
        SessionError::SessionCreationFailed(format!("cannot create {}: {}", path.display(), e))
    })?;

    if !path.is_dir() {
        return Err(SessionError::SessionCreationFailed(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    log::info!("Created session directory {}", path.display());
    Ok(path)
}

/// All session folders under `captures_root`, newest first.
///
/// Hidden entries and plain files are ignored. A missing or unreadable
/// root yields an empty list.
pub fn list_session_directories(captures_root: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(captures_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("No session listing for {}: {}", captures_root.display(), e);
            return Vec::new();
        }
    };

    let mut sessions: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| (creation_time(&entry.path()), entry.path()))
        .collect();

    sessions.sort_by(|a, b| b.0.cmp(&a.0));
    sessions.into_iter().map(|(_, path)| path).collect()
}

/// Run `list_session_directories` on the work queue.
pub fn request_session_listing(queue: &WorkQueue, captures_root: PathBuf) -> Completion<Vec<PathBuf>> {
    queue.submit(move || list_session_directories(&captures_root))
}

/// Remove a whole session folder and everything in it, on the work queue.
pub fn delete_session_directory(queue: &WorkQueue, path: PathBuf) -> Completion<Result<(), SessionError>> {
    queue.submit(move || {
        fs::remove_dir_all(&path).map_err(|e| {
            log::warn!("Failed to delete session {}: {}", path.display(), e);
            SessionError::directory_unavailable(&path, e)
        })?;
        log::info!("Deleted session directory {}", path.display());
        Ok(())
    })
}

/// Creation time, falling back to modification time, then the epoch.
fn creation_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .unwrap_or(UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    use chrono::Utc;

    #[test]
    fn name_uses_medium_date_and_time() {
        let at = Utc.with_ymd_and_hms(2022, 10, 29, 16, 5, 9).unwrap();
        assert_eq!(session_directory_name(&at), "Oct 29, 2022 at 4:05:09 PM");

        let morning = Utc.with_ymd_and_hms(2023, 3, 4, 0, 30, 0).unwrap();
        assert_eq!(session_directory_name(&morning), "Mar 4, 2023 at 12:30:00 AM");
    }

    #[test]
    fn creates_directory_under_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Captures");

        let session = create_session_directory(&root).unwrap();
        assert!(session.is_dir());
        assert_eq!(session.parent(), Some(root.as_path()));
    }

    #[test]
    fn creation_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Captures");
        fs::write(&root, b"not a folder").unwrap();

        assert!(matches!(
            create_session_directory(&root),
            Err(SessionError::SessionCreationFailed(_))
        ));
    }

    #[test]
    fn listing_is_newest_first_and_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["first", "second", "third"] {
            fs::create_dir(dir.path().join(name)).unwrap();
            thread::sleep(Duration::from_millis(20));
        }
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();

        let listing = list_session_directories(dir.path());
        let names: Vec<_> = listing
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_session_directories(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn listing_and_deletion_run_on_queue() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("old session");
        fs::create_dir(&session).unwrap();
        fs::write(session.join("IMG_0001.HEIC"), b"img").unwrap();

        let queue = WorkQueue::new("test-io").unwrap();
        let listing = request_session_listing(&queue, dir.path().to_path_buf())
            .wait_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(listing, vec![session.clone()]);

        delete_session_directory(&queue, session.clone())
            .wait_timeout(Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert!(!session.exists());

        let again = delete_session_directory(&queue, session)
            .wait_timeout(Duration::from_secs(5))
            .unwrap();
        assert!(matches!(again, Err(SessionError::DirectoryUnavailable { .. })));
    }
}
