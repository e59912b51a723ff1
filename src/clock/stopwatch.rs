//! Elapsed-time sources
//!
//! A [`Stopwatch`] reports how much time has accumulated while it was running
//! since its last reset. Readings never decrease while it runs.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Elapsed-time source consumed by the transport controller.
///
/// All methods take `&self` so one instance can be shared between the
/// controller and whoever injected it.
pub trait Stopwatch: Send + Sync {
    /// Start accumulating. No-op if already running.
    fn start(&self);

    /// Stop accumulating, keeping the elapsed reading. No-op if stopped.
    fn stop(&self);

    /// Zero the elapsed reading. The running condition is unchanged.
    fn reset(&self);

    /// Time accumulated while running since the last reset.
    fn elapsed(&self) -> Duration;

    fn is_running(&self) -> bool;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// System Stopwatch
// ============================================================================

#[derive(Debug, Default)]
struct SystemInner {
    accumulated: Duration,
    started_at: Option<Instant>,
}

/// Stopwatch backed by the monotonic [`Instant`] clock.
#[derive(Debug, Default)]
pub struct SystemStopwatch {
    inner: Mutex<SystemInner>,
}

impl SystemStopwatch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stopwatch for SystemStopwatch {
    fn start(&self) {
        let mut inner = lock(&self.inner);
        if inner.started_at.is_none() {
            inner.started_at = Some(Instant::now());
        }
    }

    fn stop(&self) {
        let mut inner = lock(&self.inner);
        if let Some(started) = inner.started_at.take() {
            inner.accumulated += started.elapsed();
        }
    }

    fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.accumulated = Duration::ZERO;
        if inner.started_at.is_some() {
            inner.started_at = Some(Instant::now());
        }
    }

    fn elapsed(&self) -> Duration {
        let inner = lock(&self.inner);
        match inner.started_at {
            Some(started) => inner.accumulated + started.elapsed(),
            None => inner.accumulated,
        }
    }

    fn is_running(&self) -> bool {
        lock(&self.inner).started_at.is_some()
    }
}

// ============================================================================
// Manual Stopwatch
// ============================================================================

#[derive(Debug, Default)]
struct ManualInner {
    elapsed: Duration,
    running: bool,
}

/// Programmable stopwatch for deterministic tests and externally clocked hosts.
///
/// Time only moves when [`advance`](ManualStopwatch::advance) is called, and
/// only while the stopwatch is running.
///
/// # Example
/// ```
/// use playhead::clock::{ManualStopwatch, Stopwatch};
/// use std::time::Duration;
///
/// let watch = ManualStopwatch::new();
/// watch.advance(Duration::from_millis(10)); // stopped: ignored
/// watch.start();
/// watch.advance(Duration::from_millis(16));
/// assert_eq!(watch.elapsed(), Duration::from_millis(16));
/// ```
#[derive(Debug, Default)]
pub struct ManualStopwatch {
    inner: Mutex<ManualInner>,
}

impl ManualStopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta` if running.
    pub fn advance(&self, delta: Duration) {
        let mut inner = lock(&self.inner);
        if inner.running {
            inner.elapsed += delta;
        }
    }

    /// Overwrite the elapsed reading regardless of the running condition.
    pub fn set_elapsed(&self, elapsed: Duration) {
        lock(&self.inner).elapsed = elapsed;
    }
}

impl Stopwatch for ManualStopwatch {
    fn start(&self) {
        lock(&self.inner).running = true;
    }

    fn stop(&self) {
        lock(&self.inner).running = false;
    }

    fn reset(&self) {
        lock(&self.inner).elapsed = Duration::ZERO;
    }

    fn elapsed(&self) -> Duration {
        lock(&self.inner).elapsed
    }

    fn is_running(&self) -> bool {
        lock(&self.inner).running
    }
}
