use crate::models::state::SessionEvent;

/// Subscriber for published session state.
///
/// Called from the caller's thread as well as the session worker, timer and
/// provider threads, never while a session lock is held. Implementations should marshal to
/// the UI thread if needed.
pub trait SessionDelegate: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}
