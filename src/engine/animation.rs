//! Animation bookkeeping for `animate_to`
//!
//! An [`Animation`] moves the playhead linearly from a start value to a target
//! over a duration measured on the stopwatch. All overlapping `animate_to`
//! calls share one completion signal, surfaced to callers as
//! [`AnimationHandle`].

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::watch;

use crate::engine::transport::TransportState;
use crate::timestamp::TimeStamp;

/// Linear interpolation from `start` to `target`.
///
/// Uses integer nanosecond arithmetic, so the result is exact whenever the
/// fraction divides evenly and equals `target` once `elapsed >= duration`.
pub fn interpolate(
    start: TimeStamp,
    target: TimeStamp,
    elapsed: Duration,
    duration: Duration,
) -> TimeStamp {
    if elapsed >= duration {
        return target;
    }
    let start_ns = start.as_duration().as_nanos();
    let target_ns = target.as_duration().as_nanos();
    let elapsed_ns = elapsed.as_nanos();
    let duration_ns = duration.as_nanos();

    let value_ns = if target_ns >= start_ns {
        start_ns + (target_ns - start_ns) * elapsed_ns / duration_ns
    } else {
        start_ns - (start_ns - target_ns) * elapsed_ns / duration_ns
    };
    TimeStamp::new(nanos_to_duration(value_ns))
}

fn nanos_to_duration(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}

/// Direction state for moving from `from` to `to`.
pub(crate) fn animating_direction(from: TimeStamp, to: TimeStamp) -> TransportState {
    if to > from {
        TransportState::AnimatingForward
    } else {
        TransportState::AnimatingBackward
    }
}

/// In-flight animation. Owned by the controller core.
#[derive(Debug)]
pub(crate) struct Animation {
    /// Playhead value when the animation was last (re)targeted
    pub start_time: TimeStamp,
    /// Stopwatch reading when the animation was last (re)targeted
    pub origin: Duration,
    pub target_time: TimeStamp,
    pub duration: Duration,

    /// Conditions to restore on completion
    pub state_before: TransportState,
    pub ticker_was_running: bool,
    pub stopwatch_was_running: bool,

    completion: watch::Sender<bool>,
}

impl Animation {
    pub fn new(
        start_time: TimeStamp,
        origin: Duration,
        target_time: TimeStamp,
        duration: Duration,
        state_before: TransportState,
        ticker_was_running: bool,
        stopwatch_was_running: bool,
    ) -> Self {
        let (completion, _) = watch::channel(false);
        Self {
            start_time,
            origin,
            target_time,
            duration,
            state_before,
            ticker_was_running,
            stopwatch_was_running,
            completion,
        }
    }

    /// Redirect toward a new target, continuing from `start_time`.
    pub fn retarget(
        &mut self,
        start_time: TimeStamp,
        origin: Duration,
        target_time: TimeStamp,
        duration: Duration,
    ) {
        self.start_time = start_time;
        self.origin = origin;
        self.target_time = target_time;
        self.duration = duration;
    }

    pub fn direction(&self) -> TransportState {
        animating_direction(self.start_time, self.target_time)
    }

    fn elapsed(&self, reading: Duration) -> Duration {
        reading.saturating_sub(self.origin)
    }

    /// Complete once strictly past the duration; a zero duration completes
    /// on the first tick.
    pub fn is_finished_at(&self, reading: Duration) -> bool {
        self.duration.is_zero() || self.elapsed(reading) > self.duration
    }

    pub fn value_at(&self, reading: Duration) -> TimeStamp {
        interpolate(
            self.start_time,
            self.target_time,
            self.elapsed(reading),
            self.duration,
        )
    }

    pub fn handle(&self) -> AnimationHandle {
        AnimationHandle {
            done: self.completion.subscribe(),
        }
    }

    /// Release every awaiting handle. Used for completion and cancellation.
    pub fn resolve(self) {
        self.completion.send_replace(true);
    }
}

/// Completion handle returned by `animate_to`.
///
/// Await it (it implements [`IntoFuture`]) to suspend until the animation,
/// or whichever retarget of it is latest, finishes or is cancelled.
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    done: watch::Receiver<bool>,
}

impl AnimationHandle {
    /// Whether the shared animation has finished or been cancelled.
    pub fn is_complete(&self) -> bool {
        *self.done.borrow()
    }
}

impl IntoFuture for AnimationHandle {
    type Output = ();
    type IntoFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn into_future(mut self) -> Self::IntoFuture {
        Box::pin(async move {
            // A closed channel means the animation can no longer complete.
            let _ = self.done.wait_for(|done| *done).await;
        })
    }
}
