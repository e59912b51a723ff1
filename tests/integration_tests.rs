//! Integration Tests
//!
//! End-to-end scenarios for the transport controller, driven deterministically
//! by a manual ticker and a programmable stopwatch.

use std::future::IntoFuture;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use playhead::clock::{ManualStopwatch, ManualTicker, Stopwatch, Ticker};
use playhead::{TimeStamp, TransportConfig, TransportController, TransportState};
use tokio::sync::mpsc::UnboundedReceiver;

/// Helper bundling a controller with its deterministic collaborators
struct Harness {
    transport: TransportController,
    ticker: Arc<ManualTicker>,
    stopwatch: Arc<ManualStopwatch>,
    stamps: Arc<Mutex<Vec<TimeStamp>>>,
    states: UnboundedReceiver<TransportState>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    fn with_config(config: TransportConfig) -> Self {
        let ticker = Arc::new(ManualTicker::new());
        let stopwatch = Arc::new(ManualStopwatch::new());
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stamps);
        let transport = TransportController::builder(move |stamp| {
            sink.lock().unwrap().push(stamp);
        })
        .config(config)
        .ticker(ticker.clone())
        .stopwatch(stopwatch.clone())
        .build()
        .unwrap();
        let states = transport.subscribe_state();
        Self {
            transport,
            ticker,
            stopwatch,
            stamps,
            states,
        }
    }

    /// Advance the clock by one interval and fire the ticker
    fn frame(&self, millis: u64) -> bool {
        self.stopwatch.advance(Duration::from_millis(millis));
        self.ticker.fire()
    }

    fn take_stamps(&self) -> Vec<TimeStamp> {
        std::mem::take(&mut *self.stamps.lock().unwrap())
    }

    fn take_states(&mut self) -> Vec<TransportState> {
        let mut seen = Vec::new();
        while let Ok(state) = self.states.try_recv() {
            seen.push(state);
        }
        seen
    }
}

fn ms(millis: u64) -> TimeStamp {
    TimeStamp::from_millis(millis)
}

// === Play / Pause Scenarios ===

#[test]
fn test_play_five_frames_then_pause() {
    let h = Harness::new();
    h.transport.play();

    for _ in 0..5 {
        assert!(h.frame(16));
    }
    let stamps = h.take_stamps();
    assert_eq!(stamps.len(), 5, "one delivery per frame");
    for pair in stamps.windows(2) {
        assert!(pair[1] > pair[0], "stamps must strictly increase");
        assert_eq!(
            pair[1].as_duration() - pair[0].as_duration(),
            Duration::from_millis(16)
        );
    }

    h.stopwatch.advance(Duration::from_millis(7));
    h.transport.pause();
    assert_eq!(h.take_stamps(), vec![ms(87)]);

    // Ticker is stopped: frames produce nothing.
    assert!(!h.frame(16));
    assert!(!h.frame(16));
    assert!(h.take_stamps().is_empty());

    h.transport.play();
    h.frame(16);
    assert_eq!(h.take_stamps(), vec![ms(103)]);
}

#[test]
fn test_alternating_play_pause_freezes_and_resumes() {
    let h = Harness::new();
    let mut expected = TimeStamp::ZERO;

    for round in 0..4 {
        h.transport.play();
        let mut previous = h.transport.current_time();
        assert_eq!(previous, expected, "round {} resumes from frozen value", round);
        for _ in 0..3 {
            h.frame(10);
            let now = h.transport.current_time();
            assert!(now > previous);
            previous = now;
        }

        h.transport.pause();
        expected = h.transport.current_time();
        h.stopwatch.advance(Duration::from_millis(250));
        assert_eq!(h.transport.current_time(), expected, "frozen while paused");
    }
    assert_eq!(expected, ms(120));
}

// === Stop Scenarios ===

#[test]
fn test_stop_from_every_state() {
    let setups: Vec<Box<dyn Fn(&Harness)>> = vec![
        Box::new(|_: &Harness| {}),
        Box::new(|h: &Harness| h.transport.play()),
        Box::new(|h: &Harness| {
            h.transport.play();
            h.frame(30);
            h.transport.pause();
        }),
        Box::new(|h: &Harness| h.transport.jump_to(ms(900))),
        Box::new(|h: &Harness| {
            let _ = h
                .transport
                .animate_to_over(ms(900), Duration::from_millis(100));
            h.frame(20);
        }),
    ];

    for setup in setups {
        let h = Harness::new();
        setup(&h);
        h.take_stamps();

        h.transport.stop();
        assert_eq!(h.transport.state(), TransportState::Stopped);
        assert_eq!(h.transport.current_time(), TimeStamp::ZERO);
        assert_eq!(h.take_stamps(), vec![TimeStamp::ZERO]);
        assert!(!h.ticker.is_running());
    }
}

// === Jump Scenarios ===

#[test]
fn test_jump_round_trip() {
    let h = Harness::new();
    for target in [ms(1234), ms(5), ms(99_000)] {
        h.transport.jump_to(target);
        assert_eq!(h.transport.current_time(), target);
        assert_eq!(h.transport.state(), TransportState::Paused);
    }
}

#[test]
fn test_jump_notification_order() {
    let mut h = Harness::new();
    h.transport.jump_to(ms(400));
    h.transport.jump_to(ms(100));

    assert_eq!(
        h.take_states(),
        vec![
            TransportState::JumpingForward,
            TransportState::Paused,
            TransportState::JumpingBackward,
            TransportState::Paused,
        ]
    );
    assert_eq!(h.take_stamps(), vec![ms(400), ms(100)]);
}

#[test]
fn test_jump_to_zero_from_paused_stays_paused() {
    let mut h = Harness::new();
    h.transport.jump_to(ms(300));
    h.take_states();

    h.transport.jump_to(TimeStamp::ZERO);
    assert_eq!(
        h.take_states(),
        vec![TransportState::JumpingBackward, TransportState::Paused]
    );
}

#[test]
fn test_jump_to_live_time_while_playing_is_no_op() {
    let mut h = Harness::new();
    h.transport.play();
    h.frame(40);
    h.take_states();
    h.take_stamps();

    h.transport.jump_to(ms(40));
    assert!(h.take_states().is_empty());
    assert!(h.take_stamps().is_empty());
    assert!(h.transport.is_playing());
}

// === Animation Scenarios ===

#[test]
fn test_animation_quarter_samples() {
    let mut h = Harness::new();
    let handle = h
        .transport
        .animate_to_over(ms(1000), Duration::from_millis(100));

    let mut frames = 0;
    while !handle.is_complete() {
        assert!(h.frame(25));
        frames += 1;
        assert!(frames <= 5, "animation must finish");
    }

    let stamps = h.take_stamps();
    assert_eq!(stamps, vec![ms(250), ms(500), ms(750), ms(1000), ms(1000)]);
    assert_eq!(*stamps.last().unwrap(), ms(1000));
    assert_eq!(
        h.take_states(),
        vec![TransportState::AnimatingForward, TransportState::Paused]
    );
}

#[test]
fn test_animation_backward_is_monotonic() {
    let h = Harness::new();
    h.transport.jump_to(ms(2000));
    h.take_stamps();

    let handle = h
        .transport
        .animate_to_over(ms(400), Duration::from_millis(160));
    while !handle.is_complete() {
        h.frame(16);
    }

    let stamps = h.take_stamps();
    for pair in stamps.windows(2) {
        assert!(pair[1] <= pair[0], "backward animation must not increase");
    }
    for stamp in &stamps {
        assert!(*stamp >= ms(400) && *stamp < ms(2000));
    }
    assert_eq!(*stamps.last().unwrap(), ms(400));
    assert_eq!(h.transport.state(), TransportState::Paused);
}

#[test]
fn test_animation_uses_configured_default_duration() {
    let config = TransportConfig::default().with_animation_duration(Duration::from_millis(40));
    let h = Harness::with_config(config);
    assert_eq!(
        h.transport.default_animation_duration(),
        Duration::from_millis(40)
    );

    let handle = h.transport.animate_to(ms(80));
    h.frame(20);
    assert_eq!(h.take_stamps(), vec![ms(40)]);
    h.frame(20);
    h.frame(20);
    assert!(handle.is_complete());
}

#[test]
fn test_animation_restores_ticker_and_stopwatch() {
    let h = Harness::new();
    h.transport.jump_to(ms(50));
    assert!(!h.ticker.is_running());
    assert!(!h.stopwatch.is_running());

    let handle = h
        .transport
        .animate_to_over(ms(150), Duration::from_millis(30));
    assert!(h.ticker.is_running());
    assert!(h.stopwatch.is_running());

    while !handle.is_complete() {
        h.frame(10);
    }
    assert!(!h.ticker.is_running());
    assert!(!h.stopwatch.is_running());
    assert_eq!(h.transport.current_time(), ms(150));
}

#[tokio::test]
async fn test_retargeted_callers_complete_together() {
    let h = Harness::new();
    let first = h
        .transport
        .animate_to_over(ms(1000), Duration::from_millis(100));
    h.frame(40);
    let second = h
        .transport
        .animate_to_over(ms(200), Duration::from_millis(50));

    let waiter_one = tokio::spawn(first.clone().into_future());
    let waiter_two = tokio::spawn(second.into_future());
    tokio::task::yield_now().await;
    assert!(!waiter_one.is_finished());
    assert!(!waiter_two.is_finished());

    h.frame(25);
    h.frame(26);
    assert!(first.is_complete());
    waiter_one.await.unwrap();
    waiter_two.await.unwrap();
    assert_eq!(h.transport.current_time(), ms(200));
}

// === Reentrancy ===

#[test]
fn test_time_callback_may_pause_controller() {
    let slot: Arc<OnceLock<Weak<TransportController>>> = Arc::new(OnceLock::new());
    let callback_slot = Arc::clone(&slot);
    let ticker = Arc::new(ManualTicker::new());
    let stopwatch = Arc::new(ManualStopwatch::new());

    let transport = Arc::new(
        TransportController::builder(move |stamp| {
            if stamp >= TimeStamp::from_millis(48) {
                if let Some(transport) = callback_slot.get().and_then(Weak::upgrade) {
                    transport.pause();
                }
            }
        })
        .ticker(ticker.clone())
        .stopwatch(stopwatch.clone())
        .build()
        .unwrap(),
    );
    slot.set(Arc::downgrade(&transport)).unwrap();

    transport.play();
    for _ in 0..5 {
        stopwatch.advance(Duration::from_millis(16));
        ticker.fire();
    }

    assert_eq!(transport.state(), TransportState::Paused);
    assert_eq!(transport.current_time(), TimeStamp::from_millis(48));
    assert!(!ticker.is_running());
}

// === Lifecycle ===

#[tokio::test]
async fn test_owned_resources_released_on_dispose() {
    let transport = TransportController::new(|_| {}).unwrap();
    let mut states = transport.subscribe_state();

    transport.play();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(transport.current_time() > TimeStamp::ZERO);

    transport.dispose();
    assert_eq!(states.recv().await, Some(TransportState::Playing));
    assert_eq!(states.recv().await, Some(TransportState::Stopped));
    assert_eq!(states.recv().await, None, "stream closes at dispose");
}

#[tokio::test]
async fn test_interval_ticker_drives_playback() {
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stamps);
    let config = TransportConfig::default().with_frame_rate(100.0);
    let transport = TransportController::builder(move |stamp| {
        sink.lock().unwrap().push(stamp);
    })
    .config(config)
    .build()
    .unwrap();

    transport.play();
    tokio::time::sleep(Duration::from_millis(80)).await;
    transport.pause();

    let stamps = stamps.lock().unwrap().clone();
    assert!(stamps.len() >= 2, "expected several ticks, got {}", stamps.len());
    for pair in stamps.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[test]
fn test_construction_without_runtime_fails() {
    let result = TransportController::new(|_| {});
    assert_eq!(result.unwrap_err().error_code(), "NO_RUNTIME");
}

#[test]
fn test_invalid_config_rejected() {
    let config = TransportConfig::default().with_frame_rate(-5.0);
    let result = TransportController::builder(|_| {})
        .config(config)
        .ticker(Arc::new(ManualTicker::new()))
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_unrepresentable_frame_rate_fails_build() {
    let config = TransportConfig::default().with_frame_rate(1e-300);
    let result = TransportController::builder(|_| {}).config(config).build();
    assert_eq!(result.unwrap_err().error_code(), "INVALID_FRAME_RATE");
}

// === State Stream ===

#[test]
fn test_slow_subscriber_receives_every_state() {
    let mut h = Harness::new();

    // 80 notifications with nobody reading in between.
    for i in 1..=40 {
        h.transport.jump_to(ms(i * 10));
    }

    let states = h.take_states();
    assert_eq!(states.len(), 80, "no notification dropped");
    for pair in states.chunks(2) {
        assert_eq!(
            pair,
            [TransportState::JumpingForward, TransportState::Paused]
        );
    }
}

#[test]
fn test_dropped_subscriber_does_not_affect_others() {
    let mut h = Harness::new();
    let dropped = h.transport.subscribe_state();
    drop(dropped);

    h.transport.play();
    h.transport.pause();
    assert_eq!(
        h.take_states(),
        vec![TransportState::Playing, TransportState::Paused]
    );
}

#[test]
fn test_subscribe_after_dispose_is_closed() {
    let h = Harness::new();
    h.transport.dispose();
    let mut late = h.transport.subscribe_state();
    assert!(matches!(
        late.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
    ));
}
