//! Playhead - Transport/Time Controller
//!
//! Playhead provides a single authoritative "current time" for interactive
//! timelines and media players, decoupled from wall-clock reads.
//!
//! # Architecture
//!
//! - Clock: elapsed-time sources (stopwatches) and periodic tickers
//! - Engine: the transport state machine driven by play/pause/stop, jumps and
//!   animations, publishing a [`TimeStamp`] on every tick
//! - Config: read-only defaults and per-controller settings

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod timestamp;

pub use config::{TransportConfig, DEFAULT_ANIMATION_DURATION, DEFAULT_FRAME_RATE};
pub use engine::{AnimationHandle, TransportController, TransportState};
pub use error::{Result, TransportError};
pub use timestamp::TimeStamp;
