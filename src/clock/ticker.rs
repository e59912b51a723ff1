//! Periodic tickers
//!
//! A [`Ticker`] repeatedly invokes one registered callback while started.
//! [`IntervalTicker`] schedules itself on the tokio timer, [`ManualTicker`]
//! fires only when told to (tests, or hosts with their own frame callback).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::config::frame_interval_for;
use crate::error::{Result, TransportError};

/// Callback invoked on every firing.
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Periodic callback source consumed by the transport controller.
///
/// Contract:
/// - `start` and `stop` are idempotent; `stop` is safe when never started.
/// - After `stop`, no firing happens until `start` is called again.
/// - After `dispose`, no firing ever happens again.
pub trait Ticker: Send + Sync {
    fn start(&self);

    fn stop(&self);

    fn is_running(&self) -> bool;

    /// Stop permanently and drop the registered callback.
    fn dispose(&self);

    /// Register the single subscriber, replacing any previous one.
    /// `None` unsubscribes.
    fn set_callback(&self, callback: Option<TickCallback>);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Interval Ticker
// ============================================================================

struct RunningTask {
    active: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct IntervalState {
    task: Option<RunningTask>,
    disposed: bool,
}

/// Auto-driven ticker firing on a fixed tokio interval.
///
/// The first firing happens one full interval after `start`, not immediately.
pub struct IntervalTicker {
    period: Duration,
    missed_ticks: MissedTickBehavior,
    runtime: Handle,
    callback: Arc<Mutex<Option<TickCallback>>>,
    state: Mutex<IntervalState>,
}

impl IntervalTicker {
    /// Create a ticker on the current tokio runtime.
    ///
    /// # Errors
    /// [`TransportError::NoRuntime`] outside a runtime,
    /// [`TransportError::InvalidInterval`] for a zero period.
    pub fn new(period: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        Self::with_handle(period, runtime)
    }

    /// Create a ticker whose task is spawned on `runtime`.
    pub fn with_handle(period: Duration, runtime: Handle) -> Result<Self> {
        if period.is_zero() {
            return Err(TransportError::InvalidInterval);
        }
        Ok(Self {
            period,
            missed_ticks: MissedTickBehavior::Skip,
            runtime,
            callback: Arc::new(Mutex::new(None)),
            state: Mutex::new(IntervalState::default()),
        })
    }

    /// Create a ticker firing `rate` times per second on the current runtime.
    ///
    /// # Errors
    /// [`TransportError::InvalidFrameRate`] when `rate` has no representable
    /// non-zero interval, otherwise as [`new`](IntervalTicker::new).
    pub fn from_frame_rate(rate: f64) -> Result<Self> {
        Self::new(frame_interval_for(rate)?)
    }

    /// Choose how firings missed under load are handled (default: skip).
    pub fn with_missed_tick_behavior(mut self, behavior: MissedTickBehavior) -> Self {
        self.missed_ticks = behavior;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    fn halt(state: &mut IntervalState) {
        if let Some(task) = state.task.take() {
            task.active.store(false, Ordering::Release);
            task.join.abort();
        }
    }
}

impl Ticker for IntervalTicker {
    fn start(&self) {
        let mut state = lock(&self.state);
        if state.disposed || state.task.is_some() {
            return;
        }

        let active = Arc::new(AtomicBool::new(true));
        let task_active = Arc::clone(&active);
        let callback = Arc::clone(&self.callback);
        let period = self.period;
        let behavior = self.missed_ticks;

        let join = self.runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(behavior);
            loop {
                interval.tick().await;
                if !task_active.load(Ordering::Acquire) {
                    break;
                }
                let current = lock(&callback).clone();
                if let Some(fire) = current {
                    trace!("interval ticker fired");
                    fire();
                }
            }
        });

        state.task = Some(RunningTask { active, join });
        debug!(period_us = period.as_micros() as u64, "[TICKER] Interval ticker started");
    }

    fn stop(&self) {
        let mut state = lock(&self.state);
        if state.task.is_some() {
            Self::halt(&mut state);
            debug!("[TICKER] Interval ticker stopped");
        }
    }

    fn is_running(&self) -> bool {
        lock(&self.state).task.is_some()
    }

    fn dispose(&self) {
        let mut state = lock(&self.state);
        Self::halt(&mut state);
        state.disposed = true;
        lock(&self.callback).take();
    }

    fn set_callback(&self, callback: Option<TickCallback>) {
        *lock(&self.callback) = callback;
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        Self::halt(&mut lock(&self.state));
    }
}

// ============================================================================
// Manual Ticker
// ============================================================================

#[derive(Default)]
struct ManualState {
    running: bool,
    disposed: bool,
    callback: Option<TickCallback>,
    fired: u64,
}

/// Caller-driven ticker: each [`fire`](ManualTicker::fire) is one tick.
///
/// # Example
/// ```
/// use playhead::clock::{ManualTicker, Ticker};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let ticker = ManualTicker::new();
/// let count = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&count);
/// ticker.set_callback(Some(Arc::new(move || {
///     seen.fetch_add(1, Ordering::SeqCst);
/// })));
///
/// assert!(!ticker.fire()); // not started
/// ticker.start();
/// assert!(ticker.fire());
/// assert_eq!(count.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct ManualTicker {
    state: Mutex<ManualState>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke the callback once if running. Returns whether it was invoked.
    ///
    /// The callback runs without any internal lock held, so it may call
    /// `start`/`stop` on this ticker.
    pub fn fire(&self) -> bool {
        let callback = {
            let mut state = lock(&self.state);
            if !state.running || state.disposed {
                return false;
            }
            state.fired += 1;
            state.callback.clone()
        };
        match callback {
            Some(fire) => {
                fire();
                true
            }
            None => false,
        }
    }

    /// Number of firings while running, whether or not a callback was set.
    pub fn fire_count(&self) -> u64 {
        lock(&self.state).fired
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.state).disposed
    }
}

impl Ticker for ManualTicker {
    fn start(&self) {
        let mut state = lock(&self.state);
        if !state.disposed {
            state.running = true;
        }
    }

    fn stop(&self) {
        lock(&self.state).running = false;
    }

    fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    fn dispose(&self) {
        let mut state = lock(&self.state);
        state.running = false;
        state.disposed = true;
        state.callback = None;
    }

    fn set_callback(&self, callback: Option<TickCallback>) {
        lock(&self.state).callback = callback;
    }
}
