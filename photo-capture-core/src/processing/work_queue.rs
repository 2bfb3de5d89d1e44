use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle, ThreadId};

use crate::models::error::SessionError;

use super::completion::{completion, Completion};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Serial background work context for session file I/O.
///
/// One named worker thread runs jobs in submission order. Directory scans,
/// file writes and deletions all go through here so they never block the
/// caller and never interleave with each other.
pub struct WorkQueue {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl WorkQueue {
    pub fn new(name: &str) -> Result<Self, SessionError> {
        let (tx, rx) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
                log::debug!("Work queue drained, worker exiting");
            })
            .map_err(|e| SessionError::ConfigurationFailed(format!("failed to spawn worker thread: {}", e)))?;

        Ok(Self {
            tx: Some(tx),
            worker_id: handle.thread().id(),
            handle: Some(handle),
        })
    }

    /// Queue a job without waiting for it.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(ref tx) = self.tx else {
            return;
        };
        if tx.send(Box::new(job)).is_err() {
            log::error!("Work queue worker is gone, dropping job");
        }
    }

    /// Queue a job and get a handle to its result.
    pub fn submit<T, F>(&self, job: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (completer, completion) = completion();
        self.execute(move || completer.complete(job()));
        completion
    }

    /// Completes once every job queued before it has run.
    pub fn barrier(&self) -> Completion<()> {
        self.submit(|| ())
    }

    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            // The last owner can be a job running on the worker itself; it
            // exits on its own once the channel is closed.
            if !self.is_worker_thread() {
                let _ = handle.join();
            }
        }
    }
}
