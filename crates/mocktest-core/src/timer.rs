//! Per-attempt countdown that forces submission when time runs out.
//!
//! The timer owns at most one tokio task. Every decrement happens under the
//! state lock and is tagged with the generation that spawned it, so a tick
//! racing a `cancel` observes the bumped generation and does nothing.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Decrement period.
pub const TICK: Duration = Duration::from_secs(1);

/// Remaining seconds at or below which the warning state is shown.
pub const WARNING_THRESHOLD_SECS: u64 = 120;

type ExpireCallback = Box<dyn FnOnce() + Send + 'static>;

/// Render seconds as `MM:SS`. Minutes are not capped at 59.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Whether the countdown should be shown in its warning state.
pub fn is_time_warning(remaining_secs: u64) -> bool {
    remaining_secs <= WARNING_THRESHOLD_SECS
}

struct TimerState {
    remaining: u64,
    expired: bool,
    generation: u64,
    on_expire: Option<ExpireCallback>,
}

/// A countdown with explicit `start` / `cancel` lifecycle.
pub struct SessionTimer {
    state: Arc<Mutex<TimerState>>,
    updates: watch::Sender<u64>,
    handle: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn new(duration_secs: u64) -> Self {
        let (updates, _) = watch::channel(duration_secs);
        Self {
            state: Arc::new(Mutex::new(TimerState {
                remaining: duration_secs,
                expired: false,
                generation: 0,
                on_expire: None,
            })),
            updates,
            handle: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        lock_state(&self.state)
    }

    /// Start ticking. Must be called from within a tokio runtime.
    ///
    /// Returns `false` without scheduling anything if the timer is already
    /// running or has already expired. A timer that was cancelled resumes
    /// from its remaining time with the new callback.
    pub fn start<F>(&mut self, on_expire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        let generation = {
            let mut state = self.lock();
            if state.expired {
                return false;
            }
            state.generation += 1;
            state.on_expire = Some(Box::new(on_expire));
            state.generation
        };

        let state = Arc::clone(&self.state);
        let updates = self.updates.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;

                let fire = {
                    let mut s = lock_state(&state);
                    if s.generation != generation || s.expired {
                        return;
                    }
                    s.remaining = s.remaining.saturating_sub(1);
                    updates.send_replace(s.remaining);
                    tracing::debug!(remaining = s.remaining, "timer tick");
                    if s.remaining == 0 {
                        s.expired = true;
                        s.on_expire.take()
                    } else {
                        continue;
                    }
                };

                tracing::info!("time limit reached");
                if let Some(callback) = fire {
                    callback();
                }
                return;
            }
        }));
        true
    }

    /// Stop all pending decrements. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        {
            let mut state = self.lock();
            state.generation += 1;
            state.on_expire = None;
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished()) && !self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.lock().expired
    }

    pub fn remaining_secs(&self) -> u64 {
        self.lock().remaining
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_remaining(self.remaining_secs())
    }

    pub fn is_warning(&self) -> bool {
        is_time_warning(self.remaining_secs())
    }

    /// A receiver that observes every change to the remaining seconds.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock_state(state: &Mutex<TimerState>) -> MutexGuard<'_, TimerState> {
    // The expiry callback runs outside the lock.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> (Arc<AtomicU32>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicU32::new(0));
        let f = Arc::clone(&fired);
        (fired, move || {
            f.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn elapse(millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(600), "10:00");
        assert_eq!(format_remaining(59), "00:59");
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(3_725), "62:05");
    }

    #[test]
    fn warning_threshold() {
        assert!(!is_time_warning(121));
        assert!(is_time_warning(120));
        assert!(is_time_warning(0));
    }

    #[tokio::test(start_paused = true)]
    async fn expires_exactly_once() {
        let (fired, on_expire) = counter();
        let mut timer = SessionTimer::new(3);
        assert!(timer.start(on_expire));

        elapse(1_500).await;
        assert_eq!(timer.remaining_secs(), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        elapse(2_000).await;
        assert_eq!(timer.remaining_secs(), 0);
        assert!(timer.is_expired());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        elapse(10_000).await;
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_does_not_double_schedule() {
        let (fired, on_expire) = counter();
        let (_, other) = counter();
        let mut timer = SessionTimer::new(10);
        assert!(timer.start(on_expire));
        assert!(!timer.start(other));

        elapse(3_500).await;
        assert_eq!(timer.remaining_secs(), 7);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticking() {
        let (fired, on_expire) = counter();
        let mut timer = SessionTimer::new(5);
        timer.start(on_expire);

        elapse(2_500).await;
        timer.cancel();
        assert_eq!(timer.remaining_secs(), 3);

        elapse(10_000).await;
        assert_eq!(timer.remaining_secs(), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_cancel_resumes() {
        let (first, on_first) = counter();
        let (second, on_second) = counter();
        let mut timer = SessionTimer::new(4);
        timer.start(on_first);
        elapse(1_500).await;
        timer.cancel();

        assert!(timer.start(on_second));
        elapse(3_500).await;
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        let (_, again) = counter();
        assert!(!timer.start(again));
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_each_tick() {
        let (_, on_expire) = counter();
        let mut timer = SessionTimer::new(130);
        let mut rx = timer.subscribe();
        assert_eq!(*rx.borrow(), 130);
        assert!(!timer.is_warning());

        timer.start(on_expire);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 129);

        elapse(9_500).await;
        assert_eq!(timer.display(), "02:00");
        assert!(timer.is_warning());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_it() {
        let (fired, on_expire) = counter();
        let mut timer = SessionTimer::new(2);
        timer.start(on_expire);
        drop(timer);

        elapse(5_000).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
