use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::mem;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};

use crate::models::capture_artifact::CaptureArtifact;
use crate::models::capture_models::{AcquiredCapture, CaptureCapabilities, CaptureRequest, CaptureSettings};
use crate::models::capture_record::{CaptureRecord, DeletionFailure};
use crate::models::config::{check_interval_secs, SessionConfig};
use crate::models::error::SessionError;
use crate::models::state::{SessionEvent, SessionMode, SessionSnapshot};
use crate::processing::completion::Completion;
use crate::processing::interval_timer::{join_timer_thread, IntervalTimer, TriggerCallback, UpdateCallback};
use crate::processing::work_queue::WorkQueue;
use crate::storage::session_directory::{RecordsObserver, SessionDirectory};
use crate::storage::session_listing;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::session_delegate::SessionDelegate;

/// Admission state: everything the "ready to capture" predicate reads,
/// checked and mutated in one critical section.
struct Admission {
    last_id: u32,
    in_flight: BTreeSet<u32>,
    directory: Option<SessionDirectory>,
}

/// Trigger mode and the timer that belongs to it.
struct ModeState {
    mode: SessionMode,
    timer: Option<IntervalTimer>,
}

/// State published to the UI that is not derived from the directory.
struct Published {
    last_capture: Option<Arc<CaptureArtifact>>,
    mode: SessionMode,
    seconds_until_capture: f64,
    auto_capture_active: bool,
}

struct ManagerShared {
    config: SessionConfig,
    provider: Arc<dyn CaptureProvider>,
    capabilities: CaptureCapabilities,
    queue: Arc<WorkQueue>,
    delegate: RwLock<Option<Arc<dyn SessionDelegate>>>,
    admission: Mutex<Admission>,
    mode: Mutex<ModeState>,
    published: Mutex<Published>,
}

/// Coordinates photo capture for one device.
///
/// Owns the active session directory, allocates sequence IDs, bounds the
/// number of in-flight capture requests, and drives automatic capture from
/// an interval timer.
///
/// ```text
/// trigger (button / timer) → admission check → id allocation → provider
///                                                                 ↓
///        SessionDirectory ← persist ← CaptureArtifact ← completion
/// ```
///
/// Methods never block on disk or on the provider. Disk work runs on a
/// dedicated worker thread; results come back as `Completion`s and as
/// events on the `SessionDelegate`.
pub struct CaptureSessionManager {
    shared: Arc<ManagerShared>,
}

impl CaptureSessionManager {
    pub fn new(config: SessionConfig, provider: Arc<dyn CaptureProvider>) -> Result<Self, SessionError> {
        config.validate()?;

        let capabilities = provider.capabilities();
        let queue = Arc::new(WorkQueue::new("session-io")?);

        log::info!(
            "Capture session manager ready (root: {}, camera: {}, depth: {}, motion: {})",
            config.captures_root.display(),
            capabilities.camera_available,
            capabilities.depth,
            capabilities.motion
        );

        Ok(Self {
            shared: Arc::new(ManagerShared {
                config,
                provider,
                capabilities,
                queue,
                delegate: RwLock::new(None),
                admission: Mutex::new(Admission {
                    last_id: 0,
                    in_flight: BTreeSet::new(),
                    directory: None,
                }),
                mode: Mutex::new(ModeState {
                    mode: SessionMode::Manual,
                    timer: None,
                }),
                published: Mutex::new(Published {
                    last_capture: None,
                    mode: SessionMode::Manual,
                    seconds_until_capture: 0.0,
                    auto_capture_active: false,
                }),
            }),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.shared.delegate.write() = Some(delegate);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    // --- Session lifecycle ---

    /// Replace the active session with a fresh timestamp-named folder.
    ///
    /// The previous folder is left on disk. The last capture is cleared
    /// immediately; the new directory becomes active once it exists. On
    /// failure no session is active afterwards.
    pub fn request_new_session(&self) -> Completion<Result<PathBuf, SessionError>> {
        self.shared.set_last_capture(None);

        let weak = Arc::downgrade(&self.shared);
        self.shared.queue.submit(move || {
            let shared = weak
                .upgrade()
                .ok_or_else(|| SessionError::SessionCreationFailed("session manager was dropped".into()))?;
            shared.open_new_session()
        })
    }

    pub fn session_directory(&self) -> Option<SessionDirectory> {
        self.shared.admission.lock().directory.clone()
    }

    /// Reconcile the active session with its folder.
    pub fn reload_session(&self) -> Completion<Result<usize, SessionError>> {
        match self.session_directory() {
            Some(directory) => directory.reload(),
            None => Completion::ready(Err(SessionError::DirectoryUnavailable {
                path: self.shared.config.captures_root.clone(),
                reason: "no active session".into(),
            })),
        }
    }

    /// Past and present session folders, newest first.
    pub fn list_sessions(&self) -> Completion<Vec<PathBuf>> {
        session_listing::request_session_listing(&self.shared.queue, self.shared.config.captures_root.clone())
    }

    /// Delete a whole session folder. Deleting the active one leaves no
    /// session active.
    pub fn delete_session(&self, path: &Path) -> Completion<Result<(), SessionError>> {
        let was_active = {
            let mut admission = self.shared.admission.lock();
            let active = admission.directory.as_ref().is_some_and(|d| d.path() == path);
            if active {
                admission.directory = None;
            }
            active
        };
        if was_active {
            self.shared.set_last_capture(None);
            self.shared.emit(SessionEvent::SessionChanged(None));
        }

        session_listing::delete_session_directory(&self.shared.queue, path.to_path_buf())
    }

    /// Remove a capture from the active session, optionally deleting its files.
    pub fn remove_capture(&self, record: CaptureRecord, delete_files: bool) -> Completion<Vec<DeletionFailure>> {
        match self.session_directory() {
            Some(directory) => directory.remove(record, delete_files),
            None => {
                log::warn!("No active session, ignoring removal of capture {}", record.id());
                Completion::ready(Vec::new())
            }
        }
    }

    // --- Capturing ---

    /// Whether a trigger would currently be admitted.
    pub fn is_ready_to_capture(&self) -> bool {
        self.shared.is_ready(&self.shared.admission.lock())
    }

    /// Issue one capture request if admission allows it.
    ///
    /// Returns the allocated sequence ID, or `None` (with no state change)
    /// when there is no session, the session is full, or too many captures
    /// are in flight.
    pub fn trigger_capture(&self) -> Option<u32> {
        self.shared.trigger_capture()
    }

    pub fn in_flight_count(&self) -> usize {
        self.shared.admission.lock().in_flight.len()
    }

    pub fn last_capture(&self) -> Option<Arc<CaptureArtifact>> {
        self.shared.published.lock().last_capture.clone()
    }

    /// Manual mode: take a photo. Automatic mode: toggle the interval timer.
    pub fn capture_button_pressed(&self) -> Result<(), SessionError> {
        let mut state = self.shared.mode.lock();
        if !state.mode.is_automatic() {
            drop(state);
            self.trigger_capture();
            return Ok(());
        }

        if state.timer.as_ref().is_some_and(|t| t.is_running()) {
            let halted = self.shared.halt_timer(&mut state);
            drop(state);
            self.shared.finish_stop(halted);
        } else {
            let started = self.shared.start_timer(&mut state)?;
            drop(state);
            if started {
                self.shared.finish_start();
            }
        }
        Ok(())
    }

    // --- Mode state machine ---

    pub fn mode(&self) -> SessionMode {
        self.shared.mode.lock().mode
    }

    /// Switch trigger mode.
    ///
    /// Any running timer is stopped and discarded before the new mode takes
    /// effect. Entering automatic mode builds a fresh, stopped timer; start
    /// it with `start_automatic_capture`. Captures already in flight are
    /// not affected.
    pub fn set_mode(&self, mode: SessionMode) -> Result<(), SessionError> {
        let new_timer = match mode {
            SessionMode::Automatic { interval_secs } => {
                check_interval_secs("automatic interval", interval_secs)?;
                Some(self.shared.make_timer(interval_secs)?)
            }
            SessionMode::Manual => None,
        };

        let (old_timer, halted) = {
            let mut state = self.shared.mode.lock();
            let halted = self.shared.halt_timer(&mut state);
            let old_timer = mem::replace(&mut state.timer, new_timer);
            state.mode = mode;
            self.shared.published.lock().mode = mode;
            (old_timer, halted)
        };

        // Timer callbacks take other manager locks, so join outside the mode lock.
        let was_active = halted.is_some();
        if let Some(handle) = halted {
            join_timer_thread(handle);
        }
        drop(old_timer);
        self.shared.published.lock().seconds_until_capture = mode.interval_secs().unwrap_or(0.0);

        log::info!("Capture mode set to {:?}", mode);
        if was_active {
            self.shared.emit(SessionEvent::AutoCaptureActiveChanged(false));
        }
        self.shared.emit(SessionEvent::ModeChanged(mode));
        Ok(())
    }

    /// Manual → automatic(default interval) → manual.
    pub fn advance_to_next_mode(&self) -> Result<(), SessionError> {
        let next = self.mode().next(self.shared.config.default_interval_secs);
        self.set_mode(next)
    }

    /// Start the interval timer. No-op in manual mode or when already running.
    pub fn start_automatic_capture(&self) -> Result<(), SessionError> {
        let started = {
            let mut state = self.shared.mode.lock();
            self.shared.start_timer(&mut state)?
        };
        if started {
            self.shared.finish_start();
        }
        Ok(())
    }

    /// Stop the interval timer, keeping automatic mode. Idempotent.
    pub fn stop_automatic_capture(&self) {
        let halted = {
            let mut state = self.shared.mode.lock();
            self.shared.halt_timer(&mut state)
        };
        self.shared.finish_stop(halted);
    }

    pub fn is_auto_capture_active(&self) -> bool {
        self.shared.published.lock().auto_capture_active
    }

    /// The UI went away: stop automatic capture if it is running.
    pub fn pause(&self) {
        self.stop_automatic_capture();
    }

    // --- Published state ---

    pub fn snapshot(&self) -> SessionSnapshot {
        let (session_dir, records, in_flight) = {
            let admission = self.shared.admission.lock();
            (
                admission.directory.as_ref().map(|d| d.path().to_path_buf()),
                admission.directory.as_ref().map(|d| d.records()).unwrap_or_default(),
                admission.in_flight.len(),
            )
        };
        let published = self.shared.published.lock();
        let caps = &self.shared.capabilities;

        SessionSnapshot {
            session_dir,
            records,
            last_capture: published.last_capture.clone(),
            camera_available: caps.camera_available,
            high_quality_mode: caps.high_quality,
            depth_enabled: caps.depth,
            motion_enabled: caps.motion,
            mode: published.mode,
            seconds_until_capture: published.seconds_until_capture,
            auto_capture_active: published.auto_capture_active,
            in_flight,
        }
    }

    /// Completes once all disk work queued so far has finished.
    pub fn flush(&self) -> Completion<()> {
        self.shared.queue.barrier()
    }
}

impl ManagerShared {
    fn emit(&self, event: SessionEvent) {
        let delegate = self.delegate.read().clone();
        if let Some(delegate) = delegate {
            delegate.on_event(&event);
        }
    }

    fn set_last_capture(&self, capture: Option<Arc<CaptureArtifact>>) {
        self.published.lock().last_capture = capture.clone();
        self.emit(SessionEvent::LastCaptureChanged(capture));
    }

    fn is_ready(&self, admission: &Admission) -> bool {
        let Some(ref directory) = admission.directory else {
            return false;
        };
        directory.len() < self.config.max_captures && admission.in_flight.len() < self.config.max_in_flight
    }

    fn trigger_capture(self: &Arc<Self>) -> Option<u32> {
        let request = {
            let mut admission = self.admission.lock();
            if !self.is_ready(&admission) {
                log::warn!(
                    "Not ready to capture (session: {}, in flight: {})",
                    admission.directory.is_some(),
                    admission.in_flight.len()
                );
                return None;
            }
            let Some(id) = admission.last_id.checked_add(1) else {
                log::error!("Capture sequence IDs exhausted");
                return None;
            };
            admission.last_id = id;
            admission.in_flight.insert(id);

            CaptureRequest {
                id,
                settings: CaptureSettings::from_capabilities(&self.capabilities),
            }
        };

        log::debug!("Issuing capture {}", request.id);
        self.emit(SessionEvent::CaptureStarted(request.id));

        let weak = Arc::downgrade(self);
        let id = request.id;
        self.provider.acquire(
            request,
            Box::new(move |result| {
                if let Some(shared) = weak.upgrade() {
                    shared.finish_capture(id, result);
                }
            }),
        );
        Some(id)
    }

    fn finish_capture(self: &Arc<Self>, id: u32, result: Result<AcquiredCapture, SessionError>) {
        let directory = {
            let mut admission = self.admission.lock();
            admission.in_flight.remove(&id);
            admission.directory.clone()
        };

        let acquired = match result {
            Ok(acquired) => acquired,
            Err(error) => {
                log::warn!("Capture {} failed: {}", id, error);
                self.emit(SessionEvent::CaptureFailed { id, error });
                return;
            }
        };

        let artifact = Arc::new(CaptureArtifact::new(id, acquired));
        self.set_last_capture(Some(Arc::clone(&artifact)));

        let Some(directory) = directory else {
            log::warn!("No active session, capture {} not saved", id);
            return;
        };

        let persisted = directory.persist(artifact);
        // Runs right after the persist job on the same serial queue.
        let weak = Arc::downgrade(self);
        self.queue.execute(move || {
            if let Some(Err(error)) = persisted.try_take() {
                if let Some(shared) = weak.upgrade() {
                    shared.emit(SessionEvent::CaptureFailed { id, error });
                }
            }
        });
    }

    /// Runs on the work queue.
    fn open_new_session(self: &Arc<Self>) -> Result<PathBuf, SessionError> {
        let path = match session_listing::create_session_directory(&self.config.captures_root) {
            Ok(path) => path,
            Err(e) => {
                log::error!("Cannot create new session: {}", e);
                self.admission.lock().directory = None;
                self.emit(SessionEvent::SessionChanged(None));
                return Err(e);
            }
        };

        let directory = SessionDirectory::new(
            &path,
            Arc::clone(&self.queue),
            Some(self.records_observer(path.clone())),
        );
        self.admission.lock().directory = Some(directory.clone());
        self.emit(SessionEvent::SessionChanged(Some(path.clone())));

        if let Err(e) = directory.reload_now() {
            log::warn!("Initial load of {} failed: {}", path.display(), e);
        }
        Ok(path)
    }

    /// Forwards record changes of the directory at `path` while it is active.
    fn records_observer(self: &Arc<Self>, path: PathBuf) -> RecordsObserver {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |records: &[CaptureRecord]| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let is_active = shared
                .admission
                .lock()
                .directory
                .as_ref()
                .is_some_and(|d| d.path() == path);
            if is_active {
                shared.emit(SessionEvent::RecordsChanged(records.to_vec()));
            }
        })
    }

    /// Start the mode's timer. The caller holds the mode lock, so the
    /// published flag changes together with the timer.
    fn start_timer(&self, state: &mut ModeState) -> Result<bool, SessionError> {
        let interval = state.mode.interval_secs();
        let Some(timer) = state.timer.as_mut() else {
            log::debug!("Not in automatic mode, ignoring start");
            return Ok(false);
        };
        if timer.is_running() {
            return Ok(false);
        }
        timer.start()?;

        let mut published = self.published.lock();
        published.auto_capture_active = true;
        published.seconds_until_capture = interval.unwrap_or(0.0);
        Ok(true)
    }

    /// Halt the mode's timer under the mode lock. The returned handle must
    /// be joined after the lock is released.
    fn halt_timer(&self, state: &mut ModeState) -> Option<JoinHandle<()>> {
        let handle = state.timer.as_mut().and_then(|t| t.halt());
        if handle.is_some() {
            self.published.lock().auto_capture_active = false;
        }
        handle
    }

    fn finish_start(&self) {
        log::info!("Automatic capture started");
        self.emit(SessionEvent::AutoCaptureActiveChanged(true));
    }

    fn finish_stop(&self, halted: Option<JoinHandle<()>>) {
        let Some(handle) = halted else {
            return;
        };
        join_timer_thread(handle);
        log::info!("Automatic capture stopped");
        self.emit(SessionEvent::AutoCaptureActiveChanged(false));
    }

    fn make_timer(self: &Arc<Self>, interval_secs: f64) -> Result<IntervalTimer, SessionError> {
        let on_trigger: TriggerCallback = {
            let weak = Arc::downgrade(self);
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.trigger_capture();
                }
            })
        };
        let on_update: UpdateCallback = {
            let weak = Arc::downgrade(self);
            Arc::new(move |seconds_remaining: f64| {
                if let Some(shared) = weak.upgrade() {
                    shared.published.lock().seconds_until_capture = seconds_remaining;
                    shared.emit(SessionEvent::TimeUntilCapture(seconds_remaining));
                }
            })
        };

        IntervalTimer::new(
            interval_secs,
            on_trigger,
            self.config.update_interval_secs,
            Some(on_update),
        )
    }
}
