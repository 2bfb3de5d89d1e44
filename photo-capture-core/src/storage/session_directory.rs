use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::capture_artifact::{CaptureArtifact, PersistReport};
use crate::models::capture_record::{extract_id, CaptureRecord, DeletionFailure, IMAGE_SUFFIX};
use crate::models::error::SessionError;
use crate::processing::completion::Completion;
use crate::processing::work_queue::WorkQueue;

/// Called with the full record list every time it is replaced.
pub type RecordsObserver = Arc<dyn Fn(&[CaptureRecord]) + Send + Sync + 'static>;

/// One capture session folder and its reconciled record list.
///
/// The record list is a cached projection of the folder contents, sorted by
/// ascending id with no duplicates. It is replaced wholesale, so readers
/// never observe a half-updated list. All disk access runs on the shared
/// work queue.
///
/// Cloning is cheap and yields another handle to the same session.
#[derive(Clone)]
pub struct SessionDirectory {
    inner: Arc<DirectoryInner>,
}

struct DirectoryInner {
    path: PathBuf,
    records: RwLock<Arc<Vec<CaptureRecord>>>,
    queue: Arc<WorkQueue>,
    observer: Option<RecordsObserver>,
}

impl SessionDirectory {
    /// Wrap an existing folder. The record list starts empty until `reload`.
    pub fn new(path: impl Into<PathBuf>, queue: Arc<WorkQueue>, observer: Option<RecordsObserver>) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                path: path.into(),
                records: RwLock::new(Arc::new(Vec::new())),
                queue,
                observer,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn records(&self) -> Vec<CaptureRecord> {
        self.inner.records.read().to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rescan the folder and replace the record list.
    ///
    /// Resolves to the number of records found. On `DirectoryUnavailable`
    /// the previous list is kept.
    pub fn reload(&self) -> Completion<Result<usize, SessionError>> {
        let inner = Arc::clone(&self.inner);
        self.inner.queue.submit(move || inner.reload_now())
    }

    /// Reconcile on the current thread. Only called from work queue jobs.
    pub(crate) fn reload_now(&self) -> Result<usize, SessionError> {
        self.inner.reload_now()
    }

    /// Write an artifact's files, then reconcile so its record appears.
    ///
    /// Fails with `PersistenceFailed` if the image could not be written, in
    /// which case nothing is added.
    pub fn persist(&self, artifact: Arc<CaptureArtifact>) -> Completion<Result<PersistReport, SessionError>> {
        let inner = Arc::clone(&self.inner);
        self.inner.queue.submit(move || {
            let report = artifact.write_all_files(&inner.path).map_err(|e| {
                log::error!("Dropping capture {}: {}", artifact.id, e);
                e
            })?;

            if let Err(e) = inner.reload_now() {
                log::warn!("Reconcile after persisting capture {} failed: {}", artifact.id, e);
            }
            Ok(report)
        })
    }

    /// Drop a record from the list, deleting its files first if asked.
    ///
    /// The record is removed regardless of deletion outcome. Resolves to the
    /// deletions that failed; missing files do not count as failures.
    pub fn remove(&self, record: CaptureRecord, delete_files: bool) -> Completion<Vec<DeletionFailure>> {
        let inner = Arc::clone(&self.inner);
        self.inner.queue.submit(move || {
            let failures = if delete_files {
                record.delete_all_files()
            } else {
                Vec::new()
            };
            for failure in &failures {
                log::warn!(
                    "Failed to delete {} of capture {} ({}): {}",
                    failure.kind,
                    record.id(),
                    failure.path.display(),
                    failure.reason
                );
            }

            let remaining: Vec<CaptureRecord> = inner
                .records
                .read()
                .iter()
                .filter(|r| r.id() != record.id())
                .cloned()
                .collect();
            inner.publish(remaining);
            failures
        })
    }
}

impl DirectoryInner {
    fn reload_now(&self) -> Result<usize, SessionError> {
        let records = self.scan()?;
        let count = records.len();
        log::debug!("Reconciled {} captures in {}", count, self.path.display());
        self.publish(records);
        Ok(count)
    }

    fn scan(&self) -> Result<Vec<CaptureRecord>, SessionError> {
        let entries = fs::read_dir(&self.path).map_err(|e| SessionError::directory_unavailable(&self.path, e))?;

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Unreadable entry in {}: {}", self.path.display(), e);
                    continue;
                }
            };

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                log::warn!("Skipping non UTF-8 file name {:?}", file_name);
                continue;
            };
            if name.starts_with('.') || !name.ends_with(IMAGE_SUFFIX) {
                continue;
            }
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            match extract_id(name) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => log::warn!("Skipping {}: {}", name, e),
            }
        }

        Ok(ids.into_iter().map(|id| CaptureRecord::new(id, &self.path)).collect())
    }

    fn publish(&self, records: Vec<CaptureRecord>) {
        let records = Arc::new(records);
        *self.records.write() = Arc::clone(&records);
        if let Some(ref observer) = self.observer {
            observer(&records);
        }
    }
}
