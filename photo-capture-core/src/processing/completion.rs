use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::time::Duration;

/// Handle to the result of work running on another thread.
///
/// The caller decides where the continuation runs: block with `wait`,
/// poll with `try_take` from its own loop, or drop the handle to ignore
/// the result. `None` means the producer went away without completing.
#[derive(Debug)]
pub struct Completion<T> {
    rx: Receiver<T>,
}

/// Producer side of a `Completion`. Completing consumes it.
#[derive(Debug)]
pub struct Completer<T> {
    tx: SyncSender<T>,
}

pub fn completion<T>() -> (Completer<T>, Completion<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (Completer { tx }, Completion { rx })
}

impl<T> Completer<T> {
    pub fn complete(self, value: T) {
        // Receiver may have been dropped; the result is simply unobserved.
        let _ = self.tx.send(value);
    }
}

impl<T> Completion<T> {
    /// An already-finished completion.
    pub fn ready(value: T) -> Self {
        let (completer, completion) = completion();
        completer.complete(value);
        completion
    }

    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }

    pub fn wait_timeout(self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Non-blocking poll. Returns `None` while the work is still running.
    pub fn try_take(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn completes_across_threads() {
        let (completer, completion) = completion();
        thread::spawn(move || completer.complete(42u32));
        assert_eq!(completion.wait(), Some(42));
    }

    #[test]
    fn dropped_completer_yields_none() {
        let (completer, completion) = completion::<u32>();
        drop(completer);
        assert_eq!(completion.wait(), None);
    }

    #[test]
    fn try_take_polls_without_blocking() {
        let (completer, completion) = completion();
        assert_eq!(completion.try_take(), None);
        completer.complete("done");
        assert_eq!(completion.try_take(), Some("done"));
    }

    #[test]
    fn ready_is_immediately_available() {
        assert_eq!(Completion::ready(7).wait_timeout(Duration::from_millis(1)), Some(7));
    }
}
