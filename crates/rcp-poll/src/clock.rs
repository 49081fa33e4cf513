//! Time source for the poller.
//!
//! Waits go through [`Clock`] so tests can run a one-hour wait in
//! microseconds and assert on the exact sleep schedule.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic time since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Real wall-clock time backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

#[derive(Debug, Default)]
struct FakeState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Deterministic clock: `sleep` advances `now` instantly and is recorded.
#[derive(Debug, Default)]
pub struct FakeClock {
    state: Mutex<FakeState>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without recording a sleep (simulates slow I/O).
    pub fn advance(&self, by: Duration) {
        self.with(|s| s.now += by)
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.with(|s| s.sleeps.clone())
    }

    pub fn total_slept(&self) -> Duration {
        self.with(|s| s.sleeps.iter().sum())
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        // A panic while holding the lock leaves plain data behind; keep using it.
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.with(|s| s.now)
    }

    fn sleep(&self, duration: Duration) {
        self.with(|s| {
            s.now += duration;
            s.sleeps.push(duration);
        })
    }
}
