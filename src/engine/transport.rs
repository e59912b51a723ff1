//! Transport Controller for Playhead
//!
//! Produces the authoritative playhead time on every tick, driven by
//! play/pause/stop commands, instantaneous jumps and timed animations.
//!
//! The playhead is derived from a [`Stopwatch`] reading and an offset that is
//! re-synchronized at every transition that fixes a new playhead value.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use crate::clock::{IntervalTicker, Stopwatch, SystemStopwatch, TickCallback, Ticker};
use crate::config::TransportConfig;
use crate::engine::animation::{animating_direction, Animation, AnimationHandle};
use crate::engine::teardown::TeardownStack;
use crate::error::Result;
use crate::timestamp::TimeStamp;

/// Callback receiving every emitted time stamp.
pub type TimeCallback = Box<dyn Fn(TimeStamp) + Send + Sync>;

/// Transport states governing how the playhead evolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportState {
    /// Playhead follows the stopwatch
    Playing,
    /// Playhead frozen at the last committed value
    Paused,
    /// Playhead frozen at zero (initial state)
    #[default]
    Stopped,
    /// Transient: published only while a forward jump is announced
    JumpingForward,
    /// Transient: published only while a backward jump is announced
    JumpingBackward,
    /// Playhead interpolating toward a later target
    AnimatingForward,
    /// Playhead interpolating toward an earlier target
    AnimatingBackward,
}

impl TransportState {
    /// Whether this state is only ever published, never held at rest.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportState::JumpingForward | TransportState::JumpingBackward
        )
    }

    /// Whether this is one of the two animating states.
    pub fn is_animating(&self) -> bool {
        matches!(
            self,
            TransportState::AnimatingForward | TransportState::AnimatingBackward
        )
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Paused => write!(f, "Paused"),
            TransportState::Stopped => write!(f, "Stopped"),
            TransportState::JumpingForward => write!(f, "JumpingForward"),
            TransportState::JumpingBackward => write!(f, "JumpingBackward"),
            TransportState::AnimatingForward => write!(f, "AnimatingForward"),
            TransportState::AnimatingBackward => write!(f, "AnimatingBackward"),
        }
    }
}

/// Relates stopwatch readings to playhead time.
///
/// Stored as the anchor pair fixed at the last synchronization, so
/// `playhead_at(reading)` is `reading - offset` without signed durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StopwatchOffset {
    reading: Duration,
    playhead: TimeStamp,
}

impl StopwatchOffset {
    fn sync(&mut self, reading: Duration, playhead: TimeStamp) {
        self.reading = reading;
        self.playhead = playhead;
    }

    fn playhead_at(&self, reading: Duration) -> TimeStamp {
        TimeStamp::new(self.playhead.as_duration() + reading.saturating_sub(self.reading))
    }
}

/// Mutable controller state. Only touched with the core lock held.
struct Core {
    state: TransportState,
    last_time: TimeStamp,
    offset: StopwatchOffset,
    animation: Option<Animation>,
    subscribers: Vec<UnboundedSender<TransportState>>,
    stream_closed: bool,
}

impl Core {
    /// Make `state` current and send it to every subscriber, even if
    /// unchanged. Subscribers whose receiver is gone are pruned.
    fn publish(&mut self, state: TransportState) {
        debug!(from = %self.state, to = %state, "[TRANSPORT] State change");
        self.state = state;
        self.subscribers.retain(|subscriber| subscriber.send(state).is_ok());
    }
}

struct Shared {
    core: Mutex<Core>,
    stopwatch: Arc<dyn Stopwatch>,
    ticker: Arc<dyn Ticker>,
    on_time: TimeCallback,
    teardown: Mutex<TeardownStack>,
    animation_duration: Duration,
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, stamp: TimeStamp) {
        trace!(time_us = %stamp, "[TRANSPORT] Time stamp");
        (self.on_time)(stamp);
    }

    /// Playhead as the invariants define it for the current state.
    fn current_time(&self, core: &Core) -> TimeStamp {
        let reading = self.stopwatch.elapsed();
        match &core.animation {
            Some(animation) => animation.value_at(reading),
            None if core.state == TransportState::Playing => core.offset.playhead_at(reading),
            None => core.last_time,
        }
    }

    /// Drop any in-flight animation without restoring its pre-animation
    /// conditions. Returns the state it started from.
    fn cancel_animation(&self, core: &mut Core) -> Option<TransportState> {
        let animation = core.animation.take()?;
        let state_before = animation.state_before;
        debug!(
            target_us = %animation.target_time,
            "[TRANSPORT] Animation cancelled"
        );
        animation.resolve();
        Some(state_before)
    }

    // ========================================================================
    // Transport Controls
    // ========================================================================

    fn play(&self) {
        let mut guard = self.lock_core();
        let core = &mut *guard;
        if core.state == TransportState::Playing {
            debug!("[TRANSPORT] Already playing");
            return;
        }

        let current = self.current_time(core);
        self.cancel_animation(core);
        core.last_time = current;
        core.publish(TransportState::Playing);
        self.ticker.start();
        self.stopwatch.start();
        core.offset.sync(self.stopwatch.elapsed(), core.last_time);
        debug!(time_us = %core.last_time, "[TRANSPORT] Play");
    }

    fn pause(&self) {
        let frozen = {
            let mut guard = self.lock_core();
            let core = &mut *guard;
            if core.state == TransportState::Paused {
                debug!("[TRANSPORT] Already paused");
                return;
            }

            let current = self.current_time(core);
            self.cancel_animation(core);
            core.publish(TransportState::Paused);
            self.ticker.stop();
            debug!(time_us = %current, "[TRANSPORT] Paused");

            if current != core.last_time {
                core.last_time = current;
                Some(current)
            } else {
                None
            }
        };

        // Last frame before pausing.
        if let Some(stamp) = frozen {
            self.deliver(stamp);
        }
    }

    fn stop(&self) {
        {
            let mut guard = self.lock_core();
            let core = &mut *guard;
            self.cancel_animation(core);
            self.stopwatch.stop();
            self.ticker.stop();
            self.stopwatch.reset();
            core.last_time = TimeStamp::ZERO;
            core.offset.sync(self.stopwatch.elapsed(), TimeStamp::ZERO);
            if core.state != TransportState::Stopped {
                core.publish(TransportState::Stopped);
            }
            debug!("[TRANSPORT] Stopped, playhead reset to 0");
        }
        self.deliver(TimeStamp::ZERO);
    }

    fn jump_to(&self, time: TimeStamp) {
        {
            let mut guard = self.lock_core();
            let core = &mut *guard;
            let current = self.current_time(core);
            if time == current {
                debug!(time_us = %time, "[TRANSPORT] Jump to current time ignored");
                return;
            }

            let prior = self
                .cancel_animation(core)
                .unwrap_or(core.state);
            let transient = if time > current {
                TransportState::JumpingForward
            } else {
                TransportState::JumpingBackward
            };
            let steady = if time.is_zero() {
                prior
            } else {
                TransportState::Paused
            };

            core.publish(transient);
            core.publish(steady);
            core.last_time = time;

            if steady == TransportState::Playing {
                self.ticker.start();
                self.stopwatch.start();
            } else {
                self.ticker.stop();
            }
            core.offset.sync(self.stopwatch.elapsed(), time);
            debug!(from_us = %current, to_us = %time, "[TRANSPORT] Jump");
        }
        self.deliver(time);
    }

    fn animate_to(&self, target: TimeStamp, duration: Duration) -> AnimationHandle {
        let mut guard = self.lock_core();
        let core = &mut *guard;
        let reading = self.stopwatch.elapsed();

        if let Some(animation) = core.animation.as_mut() {
            let current = animation.value_at(reading);
            animation.retarget(current, reading, target, duration);
            let direction = animation.direction();
            let handle = animation.handle();
            debug!(
                from_us = %current,
                target_us = %target,
                duration_ms = duration.as_millis() as u64,
                "[TRANSPORT] Animation retargeted"
            );
            if direction != core.state {
                core.publish(direction);
            }
            return handle;
        }

        let current = self.current_time(core);
        let state_before = core.state;
        let ticker_was_running = self.ticker.is_running();
        let stopwatch_was_running = self.stopwatch.is_running();
        if !ticker_was_running {
            self.ticker.start();
        }
        if !stopwatch_was_running {
            self.stopwatch.start();
        }

        let animation = Animation::new(
            current,
            self.stopwatch.elapsed(),
            target,
            duration,
            state_before,
            ticker_was_running,
            stopwatch_was_running,
        );
        let handle = animation.handle();
        core.animation = Some(animation);
        core.last_time = current;
        core.publish(animating_direction(current, target));
        debug!(
            from_us = %current,
            target_us = %target,
            duration_ms = duration.as_millis() as u64,
            "[TRANSPORT] Animation started"
        );
        handle
    }

    // ========================================================================
    // Tick Handler
    // ========================================================================

    fn tick(&self) {
        let stamp = {
            let mut guard = self.lock_core();
            let core = &mut *guard;
            // A firing that raced with pause/stop/jump on another thread.
            if !self.ticker.is_running() {
                trace!("[TRANSPORT] Stale tick ignored");
                return;
            }
            let reading = self.stopwatch.elapsed();

            let finished = core
                .animation
                .as_ref()
                .is_some_and(|animation| animation.is_finished_at(reading));
            if finished {
                if let Some(animation) = core.animation.take() {
                    self.finish_animation(core, animation, reading);
                }
            } else if let Some(animation) = &core.animation {
                core.last_time = animation.value_at(reading);
            }

            if core.state == TransportState::Playing {
                core.last_time = core.offset.playhead_at(self.stopwatch.elapsed());
            }
            core.last_time
        };
        self.deliver(stamp);
    }

    /// Pin the playhead to the target and put ticker, stopwatch and state
    /// back the way they were before the animation.
    fn finish_animation(&self, core: &mut Core, animation: Animation, reading: Duration) {
        let target = animation.target_time;
        core.last_time = target;
        core.offset.sync(reading, target);

        if !animation.ticker_was_running {
            self.ticker.stop();
        }
        if !animation.stopwatch_was_running {
            self.stopwatch.stop();
        }

        let restored = if animation.state_before == TransportState::Stopped && !target.is_zero() {
            TransportState::Paused
        } else {
            animation.state_before
        };
        core.publish(restored);
        debug!(time_us = %target, restored = %restored, "[TRANSPORT] Animation complete");
        animation.resolve();
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn dispose(&self) {
        let actions = {
            let mut teardown = self.teardown.lock().unwrap_or_else(PoisonError::into_inner);
            if teardown.is_disposed() {
                warn!("[TRANSPORT] Dispose called on a disposed controller");
                return;
            }
            teardown.drain()
        };
        for (label, action) in actions {
            debug!(resource = label, "[TRANSPORT] Releasing");
            action();
        }
    }
}

// ============================================================================
// Public Controller
// ============================================================================

/// Single authoritative source of "current time" for a timeline.
///
/// The controller owns a transport state, the current playhead and an
/// in-flight animation (if any). Every tick of its [`Ticker`] recomputes the
/// playhead and delivers it to the time-stamp callback; state changes are
/// sent to [`subscribe_state`](TransportController::subscribe_state)
/// receivers.
///
/// Time-stamp callbacks run without any internal lock held and may call back
/// into the controller.
///
/// Using a controller after [`dispose`](TransportController::dispose) is a
/// precondition violation: commands still run but nothing is observed.
///
/// # Example
/// ```
/// use playhead::clock::{ManualStopwatch, ManualTicker};
/// use playhead::{TimeStamp, TransportController, TransportState};
/// use std::sync::Arc;
///
/// let ticker = Arc::new(ManualTicker::new());
/// let stopwatch = Arc::new(ManualStopwatch::new());
/// let transport = TransportController::builder(|_stamp| {})
///     .ticker(ticker.clone())
///     .stopwatch(stopwatch.clone())
///     .build()
///     .unwrap();
///
/// transport.jump_to(TimeStamp::from_millis(500));
/// assert_eq!(transport.state(), TransportState::Paused);
/// assert_eq!(transport.current_time(), TimeStamp::from_millis(500));
/// ```
pub struct TransportController {
    shared: Arc<Shared>,
}

impl TransportController {
    /// Controller with default configuration, an [`IntervalTicker`] on the
    /// current tokio runtime and a [`SystemStopwatch`].
    pub fn new(on_time: impl Fn(TimeStamp) + Send + Sync + 'static) -> Result<Self> {
        Self::builder(on_time).build()
    }

    /// Start configuring a controller that delivers time stamps to `on_time`.
    ///
    /// # Example
    /// ```
    /// use playhead::{TransportConfig, TransportController};
    ///
    /// let runtime = tokio::runtime::Runtime::new().unwrap();
    /// let _guard = runtime.enter();
    /// let transport = TransportController::builder(|stamp| println!("{}", stamp))
    ///     .config(TransportConfig::default().with_frame_rate(30.0))
    ///     .build()
    ///     .unwrap();
    /// assert!(!transport.is_playing());
    /// ```
    pub fn builder(
        on_time: impl Fn(TimeStamp) + Send + Sync + 'static,
    ) -> TransportControllerBuilder {
        TransportControllerBuilder {
            on_time: Box::new(on_time),
            config: TransportConfig::default(),
            ticker: None,
            stopwatch: None,
        }
    }

    /// Start advancing the playhead from where it was frozen.
    ///
    /// State transition: any (except Playing) -> Playing
    pub fn play(&self) {
        self.shared.play();
    }

    /// Freeze the playhead, delivering one final stamp if it moved since the
    /// last tick.
    ///
    /// State transition: any (except Paused) -> Paused
    pub fn pause(&self) {
        self.shared.pause();
    }

    /// Reset the playhead to zero and deliver it. Always re-zeroes, even when
    /// already stopped.
    ///
    /// State transition: any -> Stopped
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Move the playhead to `time` instantly.
    ///
    /// Publishes a transient `JumpingForward`/`JumpingBackward` followed by the
    /// steady state (the prior state for a jump to zero, otherwise `Paused`),
    /// then delivers `time`. A jump to the current time does nothing.
    pub fn jump_to(&self, time: TimeStamp) {
        self.shared.jump_to(time);
    }

    /// Animate to `target` over the configured default duration.
    pub fn animate_to(&self, target: TimeStamp) -> AnimationHandle {
        self.shared.animate_to(target, self.shared.animation_duration)
    }

    /// Animate the playhead linearly to `target` over `duration`.
    ///
    /// Setup happens immediately. Awaiting the returned handle suspends until
    /// the animation completes. Calling again while an animation is in flight
    /// retargets it, and every handle resolves when the latest target is
    /// reached.
    pub fn animate_to_over(&self, target: TimeStamp, duration: Duration) -> AnimationHandle {
        self.shared.animate_to(target, duration)
    }

    /// Release owned resources in reverse acquisition order and publish a
    /// final `Stopped`.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    /// Current steady or animating state. Transient jump states are never
    /// observed here.
    pub fn state(&self) -> TransportState {
        self.shared.lock_core().state
    }

    /// Receive every subsequent state change, transient ones included.
    ///
    /// Each subscriber gets its own unbounded queue, so a slow reader never
    /// loses notifications. The receiver closes at disposal; after disposal
    /// it is already closed.
    pub fn subscribe_state(&self) -> UnboundedReceiver<TransportState> {
        let (subscriber, receiver) = mpsc::unbounded_channel();
        let mut core = self.shared.lock_core();
        if !core.stream_closed {
            core.subscribers.push(subscriber);
        }
        receiver
    }

    /// Playhead right now, as the current state defines it.
    pub fn current_time(&self) -> TimeStamp {
        let core = self.shared.lock_core();
        self.shared.current_time(&core)
    }

    /// The last committed (delivered or frozen) playhead value.
    pub fn last_time(&self) -> TimeStamp {
        self.shared.lock_core().last_time
    }

    /// Shorthand for `state() == Playing`.
    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    /// Whether an animation is in flight.
    pub fn is_animating(&self) -> bool {
        self.shared.lock_core().animation.is_some()
    }

    /// Duration used by [`animate_to`](TransportController::animate_to).
    pub fn default_animation_duration(&self) -> Duration {
        self.shared.animation_duration
    }
}

impl Drop for TransportController {
    fn drop(&mut self) {
        if !self
            .shared
            .teardown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_disposed()
        {
            self.shared.dispose();
        }
    }
}

impl fmt::Debug for TransportController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.lock_core();
        f.debug_struct("TransportController")
            .field("state", &core.state)
            .field("last_time", &core.last_time)
            .field("animating", &core.animation.is_some())
            .finish()
    }
}

/// Configures collaborators before the controller starts listening to them.
pub struct TransportControllerBuilder {
    on_time: TimeCallback,
    config: TransportConfig,
    ticker: Option<Arc<dyn Ticker>>,
    stopwatch: Option<Arc<dyn Stopwatch>>,
}

impl TransportControllerBuilder {
    /// Replace the default configuration. Validated by `build`.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an externally owned ticker. It is not disposed with the controller.
    pub fn ticker(mut self, ticker: Arc<dyn Ticker>) -> Self {
        self.ticker = Some(ticker);
        self
    }

    /// Use an externally owned stopwatch. It is not disposed with the controller.
    pub fn stopwatch(mut self, stopwatch: Arc<dyn Stopwatch>) -> Self {
        self.stopwatch = Some(stopwatch);
        self
    }

    /// Validate the configuration, create any collaborators not injected and
    /// subscribe to the ticker.
    ///
    /// # Errors
    /// Invalid configuration, or no tokio runtime when no ticker was injected.
    pub fn build(self) -> Result<TransportController> {
        self.config.validate()?;

        let owns_stopwatch = self.stopwatch.is_none();
        let stopwatch = match self.stopwatch {
            Some(stopwatch) => stopwatch,
            None => Arc::new(SystemStopwatch::new()),
        };
        let owns_ticker = self.ticker.is_none();
        let ticker = match self.ticker {
            Some(ticker) => ticker,
            None => Arc::new(
                IntervalTicker::from_frame_rate(self.config.frame_rate)?
                    .with_missed_tick_behavior(self.config.missed_ticks.into()),
            ),
        };

        let shared = Arc::new(Shared {
            core: Mutex::new(Core {
                state: TransportState::Stopped,
                last_time: TimeStamp::ZERO,
                offset: StopwatchOffset::default(),
                animation: None,
                subscribers: Vec::new(),
                stream_closed: false,
            }),
            stopwatch: Arc::clone(&stopwatch),
            ticker: Arc::clone(&ticker),
            on_time: self.on_time,
            teardown: Mutex::new(TeardownStack::new()),
            animation_duration: self.config.animation_duration(),
        });

        let weak = Arc::downgrade(&shared);
        let on_tick: TickCallback = Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.tick();
            }
        });
        ticker.set_callback(Some(on_tick));

        register_teardown(&shared, owns_stopwatch, owns_ticker);
        debug!(
            owns_ticker,
            owns_stopwatch,
            frame_rate = self.config.frame_rate,
            "[TRANSPORT] Controller created"
        );
        Ok(TransportController { shared })
    }
}

fn register_teardown(shared: &Arc<Shared>, owns_stopwatch: bool, owns_ticker: bool) {
    let mut teardown = shared.teardown.lock().unwrap_or_else(PoisonError::into_inner);

    let weak: Weak<Shared> = Arc::downgrade(shared);
    teardown.push("state stream", move || {
        if let Some(shared) = weak.upgrade() {
            let mut core = shared.lock_core();
            core.stream_closed = true;
            core.subscribers.clear();
        }
    });

    let weak: Weak<Shared> = Arc::downgrade(shared);
    teardown.push("final state", move || {
        if let Some(shared) = weak.upgrade() {
            let mut core = shared.lock_core();
            shared.cancel_animation(&mut core);
            core.publish(TransportState::Stopped);
        }
    });

    if owns_stopwatch {
        let stopwatch = Arc::clone(&shared.stopwatch);
        teardown.push("stopwatch", move || {
            stopwatch.stop();
            stopwatch.reset();
        });
    }

    let ticker = Arc::clone(&shared.ticker);
    teardown.push("tick subscription", move || {
        ticker.stop();
        ticker.set_callback(None);
    });

    if owns_ticker {
        let ticker = Arc::clone(&shared.ticker);
        teardown.push("ticker", move || ticker.dispose());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
