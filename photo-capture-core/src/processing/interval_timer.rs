use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::models::config::check_interval_secs;
use crate::models::error::SessionError;

pub type TriggerCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Receives the seconds remaining until the next trigger.
pub type UpdateCallback = Arc<dyn Fn(f64) + Send + Sync + 'static>;

/// Result of one update tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub triggered: bool,
    /// Remaining time measured before any reset, so it is `<= 0` on a
    /// triggering tick.
    pub seconds_remaining: f64,
}

/// Clock-free trigger bookkeeping driven by explicit instants.
#[derive(Debug, Clone)]
pub struct TriggerSchedule {
    trigger_every_secs: f64,
    last_trigger: Instant,
}

impl TriggerSchedule {
    pub fn new(trigger_every_secs: f64, started_at: Instant) -> Self {
        Self {
            trigger_every_secs,
            last_trigger: started_at,
        }
    }

    pub fn tick(&mut self, now: Instant) -> Tick {
        let elapsed = now.saturating_duration_since(self.last_trigger).as_secs_f64();
        let seconds_remaining = self.trigger_every_secs - elapsed;
        let triggered = seconds_remaining <= 0.0;
        if triggered {
            self.last_trigger = now;
        }
        Tick {
            triggered,
            seconds_remaining,
        }
    }
}

/// Fires `on_trigger` every `trigger_every_secs` and reports the countdown
/// through `on_update` at a higher fixed cadence.
///
/// Runs on a dedicated thread while started. The countdown is measured
/// from the moment `start` is called.
pub struct IntervalTimer {
    trigger_every_secs: f64,
    update_every: Duration,
    on_trigger: TriggerCallback,
    on_update: Option<UpdateCallback>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IntervalTimer {
    /// Fails with `ConfigurationFailed` unless both periods are finite,
    /// positive and at most `MAX_INTERVAL_SECS`.
    pub fn new(
        trigger_every_secs: f64,
        on_trigger: TriggerCallback,
        update_every_secs: f64,
        on_update: Option<UpdateCallback>,
    ) -> Result<Self, SessionError> {
        check_interval_secs("trigger interval", trigger_every_secs)?;
        check_interval_secs("update interval", update_every_secs)?;
        let update_every = Duration::try_from_secs_f64(update_every_secs)
            .map_err(|e| SessionError::ConfigurationFailed(format!("invalid update interval: {}", e)))?;

        Ok(Self {
            trigger_every_secs,
            update_every,
            on_trigger,
            on_update,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        })
    }

    pub fn trigger_every_secs(&self) -> f64 {
        self.trigger_every_secs
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start the update loop. No-op if already running.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.is_running() {
            return Ok(());
        }

        // Fresh flag per run so a halted loop that is still finishing its
        // last tick cannot be revived by a restart.
        let running = Arc::new(AtomicBool::new(true));
        self.running = Arc::clone(&running);

        let on_trigger = Arc::clone(&self.on_trigger);
        let on_update = self.on_update.clone();
        let update_every = self.update_every;
        let mut schedule = TriggerSchedule::new(self.trigger_every_secs, Instant::now());

        let handle = thread::Builder::new()
            .name("interval-timer".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(update_every);
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }

                    let tick = schedule.tick(Instant::now());
                    if tick.triggered {
                        on_trigger();
                    }
                    if let Some(ref on_update) = on_update {
                        on_update(tick.seconds_remaining);
                    }
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SessionError::ConfigurationFailed(format!("failed to spawn timer thread: {}", e))
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Cancel the update loop. Idempotent.
    ///
    /// Once this returns no further tick runs, unless it was called from a
    /// timer callback, in which case the loop ends after that callback.
    pub fn stop(&mut self) {
        if let Some(handle) = self.halt() {
            join_timer_thread(handle);
        }
    }

    /// Signal the loop to end without waiting for it.
    ///
    /// Returns the thread handle so the caller can join it after releasing
    /// any locks the timer callbacks might need.
    pub(crate) fn halt(&mut self) -> Option<JoinHandle<()>> {
        self.running.store(false, Ordering::SeqCst);
        self.handle.take()
    }
}

/// Join a halted timer thread unless we are running on it.
pub(crate) fn join_timer_thread(handle: JoinHandle<()>) {
    if handle.thread().id() != thread::current().id() {
        let _ = handle.join();
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use approx::assert_relative_eq;

    const STEP: Duration = Duration::from_nanos(1_000_000_000 / 30);

    #[test]
    fn schedule_triggers_once_per_window() {
        let start = Instant::now();
        let mut schedule = TriggerSchedule::new(2.0, start);

        let triggered_at: Vec<u32> = (1..=200)
            .filter(|&k| schedule.tick(start + STEP * k).triggered)
            .collect();

        // 60 steps of 1/30 s fall a hair short of 2 s, so the 61st tick fires.
        assert_eq!(triggered_at, vec![61, 122, 183]);
    }

    #[test]
    fn schedule_reports_countdown() {
        let start = Instant::now();
        let mut schedule = TriggerSchedule::new(3.0, start);

        let tick = schedule.tick(start + Duration::from_millis(500));
        assert!(!tick.triggered);
        assert_relative_eq!(tick.seconds_remaining, 2.5, epsilon = 1e-9);
    }

    #[test]
    fn schedule_reports_pre_reset_value_on_trigger() {
        let start = Instant::now();
        let mut schedule = TriggerSchedule::new(1.0, start);

        let tick = schedule.tick(start + Duration::from_millis(1250));
        assert!(tick.triggered);
        assert_relative_eq!(tick.seconds_remaining, -0.25, epsilon = 1e-9);

        let next = schedule.tick(start + Duration::from_millis(1500));
        assert!(!next.triggered);
        assert_relative_eq!(next.seconds_remaining, 0.75, epsilon = 1e-9);
    }

    fn counting_timer(trigger_secs: f64, update_secs: f64) -> (IntervalTimer, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let triggers = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&triggers);
        let u = Arc::clone(&updates);
        let timer = IntervalTimer::new(
            trigger_secs,
            Arc::new(move || {
                t.fetch_add(1, Ordering::SeqCst);
            }),
            update_secs,
            Some(Arc::new(move |_: f64| {
                u.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();
        (timer, triggers, updates)
    }

    #[test]
    fn running_timer_fires_and_updates() {
        let (mut timer, triggers, updates) = counting_timer(0.1, 0.01);
        timer.start().unwrap();
        assert!(timer.is_running());

        thread::sleep(Duration::from_millis(450));
        timer.stop();

        assert!(!timer.is_running());
        assert!(triggers.load(Ordering::SeqCst) >= 2);
        assert!(updates.load(Ordering::SeqCst) > triggers.load(Ordering::SeqCst));
    }

    #[test]
    fn stop_mid_interval_cancels_pending_trigger() {
        let (mut timer, triggers, updates) = counting_timer(0.3, 0.01);
        timer.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        timer.stop();

        let updates_at_stop = updates.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(400));

        assert_eq!(triggers.load(Ordering::SeqCst), 0);
        assert_eq!(updates.load(Ordering::SeqCst), updates_at_stop);
    }

    #[test]
    fn rejects_unusable_periods() {
        let noop: TriggerCallback = Arc::new(|| {});
        for (trigger, update) in [(0.0, 0.1), (1.0, 1e20), (f64::INFINITY, 0.1), (1.0, f64::NAN)] {
            let result = IntervalTimer::new(trigger, Arc::clone(&noop), update, None);
            assert!(matches!(result, Err(SessionError::ConfigurationFailed(_))), "{} / {}", trigger, update);
        }

        let timer = IntervalTimer::new(2.5, noop, 0.1, None).unwrap();
        assert_relative_eq!(timer.trigger_every_secs(), 2.5);
        assert!(!timer.is_running());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (mut timer, _, _) = counting_timer(1.0, 0.01);
        timer.stop();
        timer.start().unwrap();
        timer.start().unwrap();
        assert!(timer.is_running());
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
    }
}
