use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic time source, injected everywhere the engine needs "now".
///
/// Kept as a trait (rather than calling `Instant::now()` directly) so the
/// Agenda State Machine and Speech Gate can be driven deterministically in
/// tests — see [`ManualClock`].
pub trait Clock: Send + Sync {
    /// Seconds elapsed since some fixed, clock-specific epoch. Only
    /// differences between two calls are meaningful; the absolute value
    /// carries no wall-clock significance.
    fn now_secs(&self) -> u64;
}

/// Production clock backed by [`std::time::Instant`].
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        self.epoch.elapsed().as_secs()
    }
}

/// Test clock that only advances when told to.
///
/// Used throughout the agenda/gate/router test suites to hit exact
/// boundary values (e.g. `0.80 * allocated`) without sleeping.
#[derive(Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start_secs: u64) -> Self {
        Self { secs: AtomicU64::new(start_secs) }
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_secs: u64) {
        self.secs.fetch_add(delta_secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}
