//! Transport Engine Module
//!
//! Core playhead logic:
//! - Transport state machine and tick handler
//! - Animation bookkeeping and interpolation
//! - Ordered teardown of owned resources

pub mod animation;
pub mod teardown;
pub mod transport;

pub use animation::{interpolate, AnimationHandle};
pub use teardown::TeardownStack;
pub use transport::{
    TimeCallback, TransportController, TransportControllerBuilder, TransportState,
};
